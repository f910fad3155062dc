use crate::cursor::Cursor;
use crate::error::{Error, Result};

/// The 8-byte PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Whether `data` starts with the PNG signature at `offset`.
pub fn has_png_signature(data: &[u8], offset: usize) -> bool {
    data.len() >= offset + 8 && data[offset..offset + 8] == PNG_SIGNATURE
}

/// Length of the PNG image starting at `offset`, up to and including the
/// IEND chunk's CRC.
///
/// Chunks are `length:u32be | type:4 | data | crc:u32be`; the walk stops
/// after consuming `IEND`. CRCs are not validated, the image is opaque.
pub fn png_length(data: &[u8], offset: usize) -> Result<usize> {
    if !has_png_signature(data, offset) {
        return Err(Error::MalformedContainer {
            reason: "missing PNG signature",
        });
    }
    let mut cursor = Cursor::new(data);
    cursor.seek(offset + 8);
    loop {
        let chunk_len = cursor.read_u32_be().map_err(truncated_png)? as usize;
        let chunk_type = cursor.read_bytes(4).map_err(truncated_png)?;
        let is_iend = chunk_type == b"IEND";
        cursor.read_bytes(chunk_len + 4).map_err(truncated_png)?;
        if is_iend {
            return Ok(cursor.position() - offset);
        }
    }
}

fn truncated_png(_: Error) -> Error {
    Error::MalformedContainer {
        reason: "PNG ended before IEND chunk",
    }
}

/// A byte stream split into its PNG image prefix and the trailing payload.
#[derive(Debug, Clone)]
pub struct PngSplit<'a> {
    /// The card image, signature through IEND CRC.
    pub image: &'a [u8],
    /// A second PNG immediately following the first, when present.
    pub face_image: Option<&'a [u8]>,
    /// Everything after the image(s).
    pub tail: &'a [u8],
}

/// Split `data` at the end of its leading PNG image.
///
/// Some variants embed a face thumbnail PNG back-to-back with the card
/// image, so a second parse is attempted before the tail begins.
pub fn split(data: &[u8]) -> Result<PngSplit<'_>> {
    let image_len = png_length(data, 0)?;
    let image = &data[..image_len];
    if has_png_signature(data, image_len) {
        let face_len = png_length(data, image_len)?;
        Ok(PngSplit {
            image,
            face_image: Some(&data[image_len..image_len + face_len]),
            tail: &data[image_len + face_len..],
        })
    } else {
        Ok(PngSplit {
            image,
            face_image: None,
            tail: &data[image_len..],
        })
    }
}

#[cfg(test)]
pub(crate) mod test_png {
    use crate::cursor::Writer;

    /// Build a minimal syntactically valid PNG (IHDR + IEND, dummy CRCs).
    pub fn tiny_png(marker: u8) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_bytes(&super::PNG_SIGNATURE);
        w.write_u32_be(13);
        w.write_bytes(b"IHDR");
        w.write_bytes(&[marker; 13]);
        w.write_u32_be(0xDEAD_BEEF);
        w.write_u32_be(0);
        w.write_bytes(b"IEND");
        w.write_u32_be(0xAE42_6082);
        w.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::test_png::tiny_png;
    use super::*;

    #[test]
    fn splits_single_png() {
        let mut data = tiny_png(1);
        let png_len = data.len();
        data.extend_from_slice(b"payload");
        let split = split(&data).unwrap();
        assert_eq!(split.image.len(), png_len);
        assert!(split.face_image.is_none());
        assert_eq!(split.tail, b"payload");
    }

    #[test]
    fn splits_double_png() {
        let mut data = tiny_png(1);
        let first_len = data.len();
        data.extend_from_slice(&tiny_png(2));
        data.extend_from_slice(&[0x64, 0, 0, 0]);
        let split = split(&data).unwrap();
        assert_eq!(split.image.len(), first_len);
        assert_eq!(split.face_image.map(|f| f.len()), Some(first_len));
        assert_eq!(split.tail, &[0x64, 0, 0, 0]);
    }

    #[test]
    fn missing_signature_fails() {
        assert!(matches!(
            split(b"not a png"),
            Err(Error::MalformedContainer { .. })
        ));
    }

    #[test]
    fn missing_iend_fails() {
        let mut data = tiny_png(1);
        data.truncate(data.len() - 4);
        assert!(matches!(
            split(&data),
            Err(Error::MalformedContainer { .. })
        ));
    }
}
