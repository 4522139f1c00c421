pub mod hasher;
pub mod ingest;
pub mod matcher;
pub mod peaks;
pub mod spectrogram;

pub use hasher::{hash_peaks, landmark_hash, Landmark};
pub use ingest::ingest_song;
pub use matcher::{identify, Identification};
pub use peaks::{pick_peaks, Peak};
pub use spectrogram::{build_spectrogram, resample, Spectrogram};
