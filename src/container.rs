use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;

use crate::meta::MetaRecord;

pub const INFO_TAG: [u8; 4] = *b"INFO";
pub const RWCP_TAG: [u8; 4] = *b"RWCP";
pub const META_TAG: [u8; 4] = *b"META";

pub const FILE_HEADER_LEN: usize = 8;
pub const CHUNK_HEADER_LEN: usize = 8;
pub const INFO_PAYLOAD_LEN: usize = 37;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("container truncated: chunk {tag} claims {expected} payload bytes, only {got} available")]
    Truncated {
        tag: String,
        expected: u64,
        got: u64,
    },

    #[error("malformed INFO chunk: payload is {got} bytes, need {INFO_PAYLOAD_LEN}")]
    MalformedInfo { got: usize },

    #[error("META chunk is not valid UTF-8")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("container read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Known physical drive geometries for the INFO drive_type byte.
/// Informational only: bytes outside 1-8 are kept verbatim on the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveType {
    SS525_40trk = 1,
    DS35_80trkAppleClv = 2,
    DS525_80trk = 3,
    DS525_40trk = 4,
    DS35_80trk = 5,
    DS8 = 6,
    DS3_80trk = 7,
    DS3_40trk = 8,
}

impl DriveType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(DriveType::SS525_40trk),
            2 => Some(DriveType::DS35_80trkAppleClv),
            3 => Some(DriveType::DS525_80trk),
            4 => Some(DriveType::DS525_40trk),
            5 => Some(DriveType::DS35_80trk),
            6 => Some(DriveType::DS8),
            7 => Some(DriveType::DS3_80trk),
            8 => Some(DriveType::DS3_40trk),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DriveType::SS525_40trk => "5.25\u{2033} SS 40trk 0.25 step",
            DriveType::DS35_80trkAppleClv => "3.5\u{2033} DS 80trk Apple CLV",
            DriveType::DS525_80trk => "5.25\u{2033} DS 80trk",
            DriveType::DS525_40trk => "5.25\u{2033} DS 40trk",
            DriveType::DS35_80trk => "3.5\u{2033} DS 80trk",
            DriveType::DS8 => "8\u{2033} DS",
            DriveType::DS3_80trk => "3\u{2033} DS 80trk",
            DriveType::DS3_40trk => "3\u{2033} DS 40trk",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoRecord {
    pub info_version: u8,
    pub creator: String,
    pub drive_type: u8,
    pub write_protected: bool,
    pub synchronized: bool,
    pub hard_sector_count: u8,
}

impl InfoRecord {
    pub fn drive_type_label(&self) -> Option<&'static str> {
        DriveType::from_byte(self.drive_type).map(DriveType::label)
    }
}

/// Decoded records of one container. Either slot may be empty if the
/// corresponding chunk never appeared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerData {
    pub info: Option<InfoRecord>,
    pub meta: Option<MetaRecord>,
}

pub fn read_container_file(path: &Path) -> Result<ContainerData, ContainerError> {
    let file = File::open(path)?;
    read_container(&mut BufReader::new(file))
}

/// Walk the chunk stream: skip the 8-byte file header, then consume
/// (tag, u32 LE size, payload) chunks until clean end-of-stream. Unknown
/// tags are skipped by reading their full payload so the cursor stays
/// aligned at 8 + size per chunk. A second INFO or META chunk overwrites
/// the first.
pub fn read_container(r: &mut impl Read) -> Result<ContainerData, ContainerError> {
    let mut file_header = [0u8; FILE_HEADER_LEN];
    let n = read_up_to(r, &mut file_header)?;
    if n < FILE_HEADER_LEN {
        // Not even a full file header; nothing decodable, but not an error.
        return Ok(ContainerData::default());
    }

    let mut data = ContainerData::default();

    loop {
        let mut header = [0u8; CHUNK_HEADER_LEN];
        let n = read_up_to(r, &mut header)?;
        if n < CHUNK_HEADER_LEN {
            break; // end of stream
        }

        let tag: [u8; 4] = header[0..4].try_into().unwrap();
        let size = u32::from_le_bytes(header[4..8].try_into().unwrap());

        let mut payload = vec![0u8; size as usize];
        let got = read_up_to(r, &mut payload)?;
        if got < size as usize {
            return Err(ContainerError::Truncated {
                tag: String::from_utf8_lossy(&tag).into_owned(),
                expected: size as u64,
                got: got as u64,
            });
        }

        match tag {
            INFO_TAG => data.info = Some(decode_info(&payload)?),
            META_TAG => {
                let text = std::str::from_utf8(&payload)?;
                data.meta = Some(MetaRecord::parse(text));
            }
            _ => {} // RWCP and anything unrecognized: payload consumed, move on
        }
    }

    Ok(data)
}

/// Fixed 37-byte INFO layout. Offsets are version-independent even though
/// an info_version byte exists; no known container reorders them.
pub fn decode_info(payload: &[u8]) -> Result<InfoRecord, ContainerError> {
    if payload.len() < INFO_PAYLOAD_LEN {
        return Err(ContainerError::MalformedInfo { got: payload.len() });
    }

    let creator = std::str::from_utf8(&payload[1..33])?
        .trim_end_matches(' ')
        .to_string();

    Ok(InfoRecord {
        info_version: payload[0],
        creator,
        drive_type: payload[33],
        write_protected: payload[34] != 0,
        synchronized: payload[35] != 0,
        hard_sector_count: payload[36],
    })
}

pub fn build_info_chunk(info: &InfoRecord) -> Vec<u8> {
    let mut payload = vec![0u8; INFO_PAYLOAD_LEN];
    payload[0] = info.info_version;

    let creator = info.creator.as_bytes();
    let n = creator.len().min(32);
    payload[1..1 + n].copy_from_slice(&creator[..n]);
    for b in &mut payload[1 + n..33] {
        *b = b' ';
    }

    payload[33] = info.drive_type;
    payload[34] = info.write_protected as u8;
    payload[35] = info.synchronized as u8;
    payload[36] = info.hard_sector_count;

    build_chunk(INFO_TAG, &payload)
}

pub fn build_meta_chunk(pairs: &[(&str, &str)]) -> Vec<u8> {
    let mut text = String::new();
    for (k, v) in pairs {
        text.push_str(k);
        text.push('\t');
        text.push_str(v);
        text.push('\n');
    }
    build_chunk(META_TAG, text.as_bytes())
}

pub fn build_chunk(tag: [u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(CHUNK_HEADER_LEN + payload.len());
    out.extend_from_slice(&tag);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// Assemble a whole container: 8-byte file header followed by chunks.
pub fn build_container(chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"A2R2\xff\x0a\x0d\x0a");
    for chunk in chunks {
        out.extend_from_slice(chunk);
    }
    out
}

fn read_up_to(r: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut got = 0usize;
    while got < buf.len() {
        let n = r.read(&mut buf[got..])?;
        if n == 0 {
            return Ok(got);
        }
        got += n;
    }
    Ok(got)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_info() -> InfoRecord {
        InfoRecord {
            info_version: 1,
            creator: "Sculptured Software".to_string(),
            drive_type: 4,
            write_protected: true,
            synchronized: false,
            hard_sector_count: 0,
        }
    }

    #[test]
    fn decodes_info_chunk_with_padded_creator() {
        let bytes = build_container(&[build_info_chunk(&sample_info())]);
        let data = read_container(&mut Cursor::new(bytes)).expect("decode");

        let info = data.info.expect("info present");
        assert_eq!(info.creator, "Sculptured Software");
        assert_eq!(info.drive_type, 4);
        assert!(info.write_protected);
        assert!(!info.synchronized);
        assert!(data.meta.is_none());
    }

    #[test]
    fn info_round_trips() {
        let original = sample_info();
        let chunk = build_info_chunk(&original);
        let decoded = decode_info(&chunk[CHUNK_HEADER_LEN..]).expect("decode");
        assert_eq!(decoded, original);
    }

    #[test]
    fn unknown_chunks_are_skipped_without_desync() {
        let weird = build_chunk(*b"XXXX", &[0xAB; 513]);
        let rwcp = build_chunk(RWCP_TAG, &[0u8; 99]);
        let info = build_info_chunk(&sample_info());
        let meta = build_meta_chunk(&[("title", "WordPerfect")]);
        let bytes = build_container(&[weird, rwcp, info, meta]);

        let mut cursor = Cursor::new(bytes.clone());
        let data = read_container(&mut cursor).expect("decode");
        assert!(data.info.is_some());
        assert_eq!(data.meta.unwrap().title.as_deref(), Some("WordPerfect"));
        // Fully consumed: 8 + sum(8 + size) bytes.
        assert_eq!(cursor.position() as usize, bytes.len());
    }

    #[test]
    fn second_info_chunk_wins() {
        let first = build_info_chunk(&sample_info());
        let mut second_record = sample_info();
        second_record.creator = "Applesauce".to_string();
        let second = build_info_chunk(&second_record);

        let bytes = build_container(&[first, second]);
        let data = read_container(&mut Cursor::new(bytes)).expect("decode");
        assert_eq!(data.info.unwrap().creator, "Applesauce");
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let mut bytes = build_container(&[]);
        bytes.extend_from_slice(&META_TAG);
        bytes.extend_from_slice(&1000u32.to_le_bytes());
        bytes.extend_from_slice(&[b'x'; 50]);

        let err = read_container(&mut Cursor::new(bytes)).unwrap_err();
        match err {
            ContainerError::Truncated { expected, got, .. } => {
                assert_eq!(expected, 1000);
                assert_eq!(got, 50);
            }
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[test]
    fn short_info_payload_is_an_error() {
        let bytes = build_container(&[build_chunk(INFO_TAG, &[1u8; 20])]);
        let err = read_container(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, ContainerError::MalformedInfo { got: 20 }));
    }

    #[test]
    fn invalid_utf8_meta_is_an_error() {
        let bytes = build_container(&[build_chunk(META_TAG, &[0xFF, 0xFE, 0x01])]);
        let err = read_container(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, ContainerError::Encoding(_)));
    }

    #[test]
    fn empty_and_headerless_streams_decode_to_nothing() {
        let empty = read_container(&mut Cursor::new(Vec::new())).expect("empty");
        assert_eq!(empty, ContainerData::default());

        let stub = read_container(&mut Cursor::new(vec![0u8; 5])).expect("stub");
        assert_eq!(stub, ContainerData::default());
    }

    #[test]
    fn out_of_range_drive_type_is_kept_verbatim() {
        let mut record = sample_info();
        record.drive_type = 42;
        let chunk = build_info_chunk(&record);
        let decoded = decode_info(&chunk[CHUNK_HEADER_LEN..]).expect("decode");
        assert_eq!(decoded.drive_type, 42);
        assert!(decoded.drive_type_label().is_none());
        assert_eq!(DriveType::from_byte(4), Some(DriveType::DS525_40trk));
    }
}
