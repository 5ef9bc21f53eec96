//! ROM-set loading for the Space Invaders board.
//!
//! The original machine carries four 2 KiB ROMs mapped back to back;
//! a pre-concatenated single image is accepted as well.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// The four ROM files in address order: 0x0000, 0x0800, 0x1000, 0x1800.
pub const ROM_PARTS: [&str; 4] = ["invaders.h", "invaders.g", "invaders.f", "invaders.e"];

const PART_SIZE: usize = 0x800;
const IMAGE_SIZE: usize = PART_SIZE * ROM_PARTS.len();

/// Load a ROM set from a directory of the four part files, or a single
/// combined image of at most 8 KiB.
pub fn load_rom_set(path: &Path) -> Result<Vec<u8>> {
    if path.is_dir() {
        let mut image = Vec::with_capacity(IMAGE_SIZE);
        for part in ROM_PARTS {
            let file = path.join(part);
            let bytes =
                fs::read(&file).with_context(|| format!("reading ROM file {}", file.display()))?;
            if bytes.len() != PART_SIZE {
                bail!(
                    "ROM file {} is {} bytes, expected {PART_SIZE}",
                    file.display(),
                    bytes.len()
                );
            }
            image.extend_from_slice(&bytes);
        }
        Ok(image)
    } else {
        let image =
            fs::read(path).with_context(|| format!("reading ROM image {}", path.display()))?;
        if image.is_empty() || image.len() > IMAGE_SIZE {
            bail!(
                "ROM image {} is {} bytes, expected at most {IMAGE_SIZE}",
                path.display(),
                image.len()
            );
        }
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("arcadeboy_rom_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn loads_a_combined_image() {
        let dir = scratch_dir("combined");
        let file = dir.join("invaders.rom");
        fs::write(&file, vec![0xabu8; 0x1000]).unwrap();

        let image = load_rom_set(&file).unwrap();
        assert_eq!(image.len(), 0x1000);
        assert!(image.iter().all(|&b| b == 0xab));
    }

    #[test]
    fn loads_a_part_directory_in_address_order() {
        let dir = scratch_dir("parts");
        for (i, part) in ROM_PARTS.iter().enumerate() {
            fs::write(dir.join(part), vec![i as u8; PART_SIZE]).unwrap();
        }

        let image = load_rom_set(&dir).unwrap();
        assert_eq!(image.len(), IMAGE_SIZE);
        for (i, chunk) in image.chunks(PART_SIZE).enumerate() {
            assert!(chunk.iter().all(|&b| b == i as u8), "part {i} misplaced");
        }
    }

    #[test]
    fn rejects_wrong_part_sizes() {
        let dir = scratch_dir("short");
        for part in ROM_PARTS {
            fs::write(dir.join(part), vec![0u8; 16]).unwrap();
        }
        assert!(load_rom_set(&dir).is_err());
    }

    #[test]
    fn missing_files_are_io_errors() {
        let dir = scratch_dir("missing");
        assert!(load_rom_set(&dir.join("nope")).is_err());
    }
}
