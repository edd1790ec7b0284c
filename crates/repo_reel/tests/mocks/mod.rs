#![allow(dead_code)]

pub mod encoder;
pub mod ingestor;
pub mod provider;
pub mod speech;
