mod downloader;
pub mod spotify;
pub mod utils;
pub mod youtube;

pub use downloader::{dl_album, dl_playlist, dl_single_track, dl_single_track_info, process_and_save_song, DownloadedTrack};
pub use youtube::get_youtube_id;
