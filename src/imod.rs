//! In-place patching of IMOD `.com` reconstruction scripts.
//!
//! The even/odd half-set reconstructions are produced by re-running an
//! existing IMOD batch setup at a different binning; the entries below are
//! the ones that have to change between runs. Only the script text is
//! touched here, never the tools themselves.
use std::fs;
use std::path::Path;

/// Replace the `BinByFactor` entry of a `newst.com` script.
///
/// Note: this overwrites the file.
pub fn modify_newst(path: &Path, bin_factor: u32) -> crate::Result<()> {
    let mut content = read_lines(path)?;

    let idx = find_entry(&content, "BinByFactor", path)?;
    content[idx] = format!("BinByFactor     {}", bin_factor);
    log::info!("{}: {}", path.display(), content[idx]);

    write_lines(path, &content)
}

/// Replace the `PixelSize` entry of a `ctfcorrection.com` script with the
/// binned pixel spacing (Angstrom, rounded to 3 decimals).
///
/// Note: this overwrites the file.
pub fn modify_ctfcorrection(
    path: &Path,
    bin_factor: u32,
    pixel_spacing: f64,
) -> crate::Result<()> {
    let mut content = read_lines(path)?;

    let binned = (bin_factor as f64 * pixel_spacing * 1000.0).round() / 1000.0;
    let idx = find_entry(&content, "PixelSize", path)?;
    content[idx] = format!("PixelSize       {}", binned);
    log::info!("{}: {}", path.display(), content[idx]);

    write_lines(path, &content)
}

/// Replace the `IMAGEBINNED` entry of a `tilt.com` script, force CPU
/// reconstruction, and set the tilt angles excluded from reconstruction.
///
/// `UseGPU 0` is inserted before the final line when absent. An existing
/// `EXCLUDELIST2` entry is replaced; otherwise one is inserted before the
/// final line. An empty `exclude_angles` leaves the exclude list untouched.
///
/// Note: this overwrites the file.
pub fn modify_tilt(path: &Path, bin_factor: u32, exclude_angles: &[i32]) -> crate::Result<()> {
    let mut content = read_lines(path)?;

    if !content.iter().any(|l| l == "UseGPU 0") {
        let at = content.len().saturating_sub(1);
        content.insert(at, "UseGPU 0".to_string());
    }

    let idx = find_entry(&content, "IMAGEBINNED", path)?;
    content[idx] = format!("IMAGEBINNED {}", bin_factor);
    log::info!("{}: {}", path.display(), content[idx]);

    if !exclude_angles.is_empty() {
        let list = exclude_angles
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let entry = format!("EXCLUDELIST2 {}", list);

        match content.iter().position(|l| l.contains("EXCLUDELIST2 ")) {
            Some(idx) => content[idx] = entry,
            None => {
                let at = content.len().saturating_sub(1);
                content.insert(at, entry);
            }
        }
    }

    write_lines(path, &content)
}

/// Patch `newst.com`, `ctfcorrection.com` and `tilt.com` in `dir` for a new
/// bin factor.
pub fn modify_com_scripts(
    dir: &Path,
    bin_factor: u32,
    pixel_spacing: f64,
    exclude_angles: &[i32],
) -> crate::Result<()> {
    modify_newst(&dir.join("newst.com"), bin_factor)?;
    modify_ctfcorrection(&dir.join("ctfcorrection.com"), bin_factor, pixel_spacing)?;
    modify_tilt(&dir.join("tilt.com"), bin_factor, exclude_angles)?;

    Ok(())
}

fn read_lines(path: &Path) -> crate::Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    Ok(text.lines().map(|l| l.trim().to_string()).collect())
}

fn write_lines(path: &Path, lines: &[String]) -> crate::Result<()> {
    let mut text = lines.join("\n");
    text.push('\n');
    fs::write(path, text)?;
    Ok(())
}

fn find_entry(content: &[String], key: &str, path: &Path) -> crate::Result<usize> {
    content
        .iter()
        .position(|l| l.contains(key))
        .ok_or_else(|| {
            crate::CryoError::Config(format!(
                "no {} entry in {}",
                key,
                path.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static TEST_FILE_ID: AtomicUsize = AtomicUsize::new(0);

    fn temp_script(name: &str, content: &str) -> PathBuf {
        let id = TEST_FILE_ID.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "cryo-denoise-imod-test-{}-{}-{}",
            std::process::id(),
            id,
            name
        ));
        fs::write(&path, content).unwrap();
        path
    }

    const NEWST: &str = "$newstack -StandardInput\n\
                         InputFile       tomo.st\n\
                         OutputFile      tomo.ali\n\
                         BinByFactor     1\n\
                         $if (-e ./savework) ./savework\n";

    const CTF: &str = "$ctfphaseflip -StandardInput\n\
                       InputStack      tomo.ali\n\
                       PixelSize       1.7\n\
                       $if (-e ./savework) ./savework\n";

    const TILT: &str = "$tilt -StandardInput\n\
                        InputProjections tomo.ali\n\
                        IMAGEBINNED 1\n\
                        $if (-e ./savework) ./savework\n";

    #[test]
    fn test_modify_newst_replaces_bin_factor() {
        let path = temp_script("newst.com", NEWST);

        modify_newst(&path, 4).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("BinByFactor     4"));
        assert!(!content.contains("BinByFactor     1"));
        assert!(content.contains("InputFile       tomo.st"));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_modify_ctfcorrection_bins_pixel_size() {
        let path = temp_script("ctfcorrection.com", CTF);

        modify_ctfcorrection(&path, 2, 1.7).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("PixelSize       3.4"), "{}", content);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_modify_tilt_full_patch() {
        let path = temp_script("tilt.com", TILT);

        modify_tilt(&path, 2, &[1, 60]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines.contains(&"IMAGEBINNED 2"));
        assert!(lines.contains(&"UseGPU 0"));
        assert!(lines.contains(&"EXCLUDELIST2 1, 60"));
        // the closing savework line stays last
        assert_eq!(lines.last(), Some(&"$if (-e ./savework) ./savework"));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_modify_tilt_gpu_line_inserted_once() {
        let path = temp_script("tilt.com", TILT);

        modify_tilt(&path, 2, &[]).unwrap();
        modify_tilt(&path, 4, &[]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("UseGPU 0").count(), 1);
        assert!(content.contains("IMAGEBINNED 4"));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_modify_tilt_replaces_existing_exclude_list() {
        let tilt = "$tilt -StandardInput\n\
                    IMAGEBINNED 1\n\
                    EXCLUDELIST2 3, 4\n\
                    $if (-e ./savework) ./savework\n";
        let path = temp_script("tilt.com", tilt);

        modify_tilt(&path, 1, &[7]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("EXCLUDELIST2 7"));
        assert!(!content.contains("EXCLUDELIST2 3, 4"));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_entry_is_an_error() {
        let path = temp_script("newst.com", "$newstack -StandardInput\n");

        let result = modify_newst(&path, 2);
        assert!(matches!(result, Err(crate::CryoError::Config(_))));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_modify_com_scripts_patches_directory() {
        let id = TEST_FILE_ID.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "cryo-denoise-imod-dir-test-{}-{}",
            std::process::id(),
            id
        ));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("newst.com"), NEWST).unwrap();
        fs::write(dir.join("ctfcorrection.com"), CTF).unwrap();
        fs::write(dir.join("tilt.com"), TILT).unwrap();

        modify_com_scripts(&dir, 4, 1.7, &[2]).unwrap();

        assert!(fs::read_to_string(dir.join("newst.com"))
            .unwrap()
            .contains("BinByFactor     4"));
        assert!(fs::read_to_string(dir.join("ctfcorrection.com"))
            .unwrap()
            .contains("PixelSize       6.8"));
        let tilt = fs::read_to_string(dir.join("tilt.com")).unwrap();
        assert!(tilt.contains("IMAGEBINNED 4"));
        assert!(tilt.contains("EXCLUDELIST2 2"));

        fs::remove_dir_all(&dir).ok();
    }
}
