pub mod audio;
pub mod audio_decode;
pub(crate) mod fft;
pub mod frequency_domain;
