pub mod chord;
pub mod console_display;
pub mod demo;
pub mod fretboard;
pub mod gesture;
pub mod instrument;
pub mod mapping;
pub mod osc_sender;
pub mod runtime;
pub mod script_reader;
pub mod session;
pub mod software_device;
pub mod synth;
pub mod timer;
pub mod tone_device;
pub mod types;

#[cfg(feature = "audio")]
pub mod audio_output;
