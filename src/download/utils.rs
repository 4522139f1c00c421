use std::fs;
use std::io;

/// Strips characters invalid in file names on common filesystems, so track
/// titles/artists containing `/`, `:`, `?` etc. can be used directly as path
/// components.
pub fn correct_filename(title: &str, artist: &str) -> (String, String) {
    const INVALID: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
    let fix = |s: &str| s.chars().filter(|c| !INVALID.contains(c)).collect::<String>();
    (fix(title), fix(artist))
}

/// Returns the file size in bytes for the given file path.
pub fn get_file_size(file: &str) -> io::Result<u64> {
    Ok(fs::metadata(file)?.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_path_hostile_characters() {
        let (title, artist) = correct_filename("AC/DC: Live?", "Artist*Name");
        assert_eq!(title, "ACDC Live");
        assert_eq!(artist, "ArtistName");
    }
}
