// Audio decoding and native voice analysis for voicetrack.

pub mod analyzer;
pub mod autocorr;
pub mod batch;
pub mod decode;
pub mod error;
pub mod harmonicity;
pub mod intensity;
pub mod perturbation;
pub mod pitch;

#[cfg(test)]
mod testutil;
