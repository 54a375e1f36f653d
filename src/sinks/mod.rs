// src/sinks/mod.rs

#[cfg(test)]
pub mod collecting;
pub mod console;
