pub mod etcd;
#[cfg(test)]
pub mod memory;
pub mod types;
