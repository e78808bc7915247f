use rasterdec::{decode, guess_format, Error, ImageFormat};
use std::io::{Cursor, Seek, SeekFrom};

//===========================================================================//

const XPM_DATA: &[u8] = b"/* XPM */\n\
static char *dot[] = {\n\
\"2 1 2 1\",\n\
\"a c #102030\",\n\
\"b c None\",\n\
\"ab\"\n\
};\n";

// A 1x1 32-bpp icon with a single opaque green pixel.
fn ico_data(restype: u16) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&40u32.to_le_bytes());
    payload.extend_from_slice(&1i32.to_le_bytes());
    payload.extend_from_slice(&2i32.to_le_bytes());
    payload.extend_from_slice(&1u16.to_le_bytes());
    payload.extend_from_slice(&32u16.to_le_bytes());
    payload.extend_from_slice(&[0; 24]);
    payload.extend_from_slice(&[0x00, 0xff, 0x00, 0xff]);
    payload.extend_from_slice(&[0; 4]);

    let mut data = Vec::new();
    data.extend_from_slice(&[0, 0]);
    data.extend_from_slice(&restype.to_le_bytes());
    data.extend_from_slice(&1u16.to_le_bytes());
    data.extend_from_slice(&[1, 1, 0, 0, 1, 0, 32, 0]);
    data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    data.extend_from_slice(&22u32.to_le_bytes());
    data.extend_from_slice(&payload);
    data
}

//===========================================================================//

#[test]
fn decode_sniffed_xpm() {
    assert_eq!(guess_format(XPM_DATA), Some(ImageFormat::Xpm));
    let image = decode(Cursor::new(XPM_DATA)).unwrap();
    assert_eq!(image.rgba_data(), &[0x10, 0x20, 0x30, 0xff, 0, 0, 0, 0]);
}

#[test]
fn decode_sniffed_xpm_without_comment() {
    let data = &XPM_DATA[10..];
    assert!(data.starts_with(b"static char"));
    let image = decode(Cursor::new(data)).unwrap();
    assert_eq!(image.width(), 2);
    assert_eq!(image.pixel(0, 0), Some([0x10, 0x20, 0x30, 0xff]));
}

#[test]
fn decode_sniffed_ico_and_cur() {
    for restype in [1, 2] {
        let data = ico_data(restype);
        assert_eq!(guess_format(&data), Some(ImageFormat::Ico));
        let image = decode(Cursor::new(data)).unwrap();
        assert_eq!(image.rgba_data(), &[0x00, 0xff, 0x00, 0xff]);
    }
}

#[test]
fn decode_from_current_position() {
    let mut data = b"junk".to_vec();
    data.extend_from_slice(XPM_DATA);
    let mut cursor = Cursor::new(data);
    cursor.seek(SeekFrom::Start(4)).unwrap();
    let image = decode(cursor).unwrap();
    assert_eq!(image.height(), 1);

    let mut data = b"junk".to_vec();
    data.extend_from_slice(&ico_data(1));
    let mut cursor = Cursor::new(data);
    cursor.seek(SeekFrom::Start(4)).unwrap();
    let image = decode(cursor).unwrap();
    assert_eq!(image.rgba_data(), &[0x00, 0xff, 0x00, 0xff]);
}

#[test]
fn decode_unknown_format() {
    for data in [&b"GIF89a"[..], &b"\x89PNG\r\n\x1a\n"[..], &b""[..]] {
        let error = decode(Cursor::new(data)).unwrap_err();
        assert!(matches!(error, Error::UnknownFormat));
        assert!(error.is_invalid_format());
    }
}

#[test]
fn format_names() {
    assert_eq!(ImageFormat::Ico.to_string(), "ICO");
    assert_eq!(ImageFormat::Xpm.to_string(), "XPM");
}

//===========================================================================//

proptest::proptest! {
    #[test]
    fn arbitrary_bytes_never_panic(
        data in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..512)
    ) {
        let _ = decode(Cursor::new(&data));
        let _ = rasterdec::ico::decode_all(Cursor::new(&data));
    }

    #[test]
    fn arbitrary_ico_entries_never_panic(
        payload in proptest::collection::vec(proptest::prelude::any::<u8>(), 40..256)
    ) {
        let mut data = ico_data(1);
        data.truncate(22);
        data[14..18].copy_from_slice(&(payload.len() as u32).to_le_bytes());
        data.extend_from_slice(&payload);
        let _ = decode(Cursor::new(data));
    }
}

//===========================================================================//
