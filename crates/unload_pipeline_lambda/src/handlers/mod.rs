pub mod invocation;
pub mod repair;
pub mod unload;

#[cfg(test)]
pub(crate) mod test_support;
