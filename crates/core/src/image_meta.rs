use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::Result;

/// Text-chunk keyword under which a modified image records the file it was
/// derived from.
pub const ORIGINAL_IMAGE_KEYWORD: &str = "OriginalImageFilename";

/// Read the original-image filename declared in a modified image's PNG text
/// chunks (`tEXt`, `zTXt` or `iTXt`). Returns `Ok(None)` when the image carries
/// no such entry or the entry is blank.
pub fn read_original_image_name(path: &Path) -> Result<Option<String>> {
    let file = File::open(path)?;
    let reader = png::Decoder::new(BufReader::new(file)).read_info()?;
    let info = reader.info();

    let mut declared = info
        .uncompressed_latin1_text
        .iter()
        .find(|c| c.keyword == ORIGINAL_IMAGE_KEYWORD)
        .map(|c| c.text.clone());

    if declared.is_none() {
        if let Some(chunk) = info
            .compressed_latin1_text
            .iter()
            .find(|c| c.keyword == ORIGINAL_IMAGE_KEYWORD)
        {
            declared = Some(chunk.get_text()?);
        }
    }

    if declared.is_none() {
        if let Some(chunk) = info
            .utf8_text
            .iter()
            .find(|c| c.keyword == ORIGINAL_IMAGE_KEYWORD)
        {
            declared = Some(chunk.get_text()?);
        }
    }

    Ok(declared
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty()))
}
