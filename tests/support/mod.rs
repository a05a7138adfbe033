#![allow(dead_code)]

pub mod detector_env;
pub mod wav;
