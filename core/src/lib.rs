pub mod config;
pub mod embed;
pub mod platform;
pub mod prepare;
pub mod rewrite;
pub mod shell;
pub mod shim;
pub mod stage;

#[cfg(test)]
mod config_test;
#[cfg(test)]
mod embed_test;
#[cfg(test)]
mod shell_test;
#[cfg(test)]
mod stage_test;
