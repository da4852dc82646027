pub(crate) mod background_logging;
pub(crate) mod test_support;
