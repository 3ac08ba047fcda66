//! Wire-format parsing: SBDIX status lines, SBDRB binary frames, checksums,
//! and the three modem query replies (§4.7).

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{Error, Result};

/// Iridium epoch used by `AT-MSSTM`: 2014-05-11T14:23:55Z.
const IRIDIUM_EPOCH_UNIX: i64 = 1_399_818_235;

/// Sum of payload bytes, low 16 bits, big-endian on the wire.
pub(crate) fn checksum(payload: &[u8]) -> u16 {
    payload.iter().fold(0u32, |acc, &b| acc + b as u32) as u16
}

/// Appends `payload`'s checksum (§6) and returns the full SBDWB write frame.
pub(crate) fn encode_sbdwb_frame(payload: &[u8]) -> Vec<u8> {
    let cksum = checksum(payload);
    let mut out = Vec::with_capacity(payload.len() + 2);
    out.extend_from_slice(payload);
    out.extend_from_slice(&cksum.to_be_bytes());
    out
}

/// Parsed `+SBDIX` status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SbdixStatus {
    pub(crate) mo_status: u32,
    pub(crate) momsn: u32,
    pub(crate) mt_status: u32,
    pub(crate) mtmsn: u32,
    pub(crate) mtlen: u32,
    pub(crate) mtqueued: u32,
}

/// Parses `+SBDIX: <status>, <momsn>, <mtstatus>, <mtmsn>, <mtlen>, <mtqueued>`
/// out of a response body that may contain other (discarded) lines around it.
pub(crate) fn parse_sbdix(body: &str) -> Result<SbdixStatus> {
    let line = body
        .lines()
        .find_map(|l| l.trim().strip_prefix("+SBDIX:"))
        .ok_or_else(|| Error::ParseError(format!("no +SBDIX line in response: {body:?}")))?;

    let mut fields = line.split(',').map(|f| f.trim());
    let mut next = || -> Result<u32> {
        fields
            .next()
            .ok_or_else(|| Error::ParseError(format!("truncated +SBDIX line: {line:?}")))?
            .parse::<u32>()
            .map_err(|e| Error::ParseError(format!("bad +SBDIX field: {e}")))
    };

    Ok(SbdixStatus {
        mo_status: next()?,
        momsn: next()?,
        mt_status: next()?,
        mtmsn: next()?,
        mtlen: next()?,
        mtqueued: next()?,
    })
}

/// Decodes an `AT+SBDRB` blob: `len_hi len_lo payload[len] cksum_hi cksum_lo`.
/// Validates both the advertised length against the blob size and the
/// trailing checksum, surfacing a `ParseError`/`ChecksumMismatch` rather
/// than indexing out of bounds on a malformed frame.
pub(crate) fn decode_sbdrb_frame(blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < 4 {
        return Err(Error::ParseError(format!(
            "SBDRB frame too short: {} bytes",
            blob.len()
        )));
    }
    let len = u16::from_be_bytes([blob[0], blob[1]]) as usize;
    let expected_total = 2 + len + 2;
    if blob.len() != expected_total {
        return Err(Error::ParseError(format!(
            "SBDRB frame length mismatch: advertised {len} bytes, got {} total",
            blob.len()
        )));
    }

    let payload = &blob[2..2 + len];
    let trailing = u16::from_be_bytes([blob[2 + len], blob[3 + len]]);
    if checksum(payload) != trailing {
        return Err(Error::ChecksumMismatch);
    }
    Ok(payload.to_vec())
}

/// Parses `+CSQ:<n>` (optionally with whitespace) into 0..=5.
pub(crate) fn parse_csq(body: &str) -> Result<u8> {
    let digits: String = body
        .find("CSQ:")
        .map(|idx| &body[idx + 4..])
        .unwrap_or(body)
        .chars()
        .skip_while(|c| c.is_whitespace())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits
        .parse::<u8>()
        .map_err(|_| Error::ParseError(format!("could not parse CSQ response: {body:?}")))
}

/// Parses `+CCLK: "YY/MM/DD,HH:MM:SS"` (quotes optional) as UTC.
pub(crate) fn parse_cclk(body: &str) -> Result<DateTime<Utc>> {
    let rest = body
        .find("CCLK:")
        .map(|idx| &body[idx + 5..])
        .unwrap_or(body)
        .trim()
        .trim_matches('"');

    let (date, time) = rest
        .split_once(',')
        .ok_or_else(|| Error::ParseError(format!("malformed CCLK response: {body:?}")))?;
    let mut date_parts = date.trim().splitn(3, '/');
    let mut time_parts = time.trim().splitn(3, ':');

    let fail = || Error::ParseError(format!("malformed CCLK response: {body:?}"));
    let yy: i32 = date_parts.next().ok_or_else(fail)?.parse().map_err(|_| fail())?;
    let mm: u32 = date_parts.next().ok_or_else(fail)?.parse().map_err(|_| fail())?;
    let dd: u32 = date_parts.next().ok_or_else(fail)?.parse().map_err(|_| fail())?;
    let hh: u32 = time_parts.next().ok_or_else(fail)?.parse().map_err(|_| fail())?;
    let min: u32 = time_parts.next().ok_or_else(fail)?.parse().map_err(|_| fail())?;
    let sec: u32 = time_parts.next().ok_or_else(fail)?.parse().map_err(|_| fail())?;

    Utc.with_ymd_and_hms(2000 + yy, mm, dd, hh, min, sec)
        .single()
        .ok_or_else(fail)
}

/// Parses `-MSSTM: <hex>` into wall time via the Iridium epoch (§4.7).
pub(crate) fn parse_msstm(body: &str) -> Result<DateTime<Utc>> {
    let hex = body
        .find("MSSTM:")
        .map(|idx| &body[idx + 6..])
        .unwrap_or(body)
        .trim();
    let ticks = u64::from_str_radix(hex, 16)
        .map_err(|_| Error::ParseError(format!("malformed MSSTM response: {body:?}")))?;
    let millis_since_epoch = ticks.saturating_mul(90);
    let ts = IRIDIUM_EPOCH_UNIX * 1000 + millis_since_epoch as i64;
    DateTime::from_timestamp_millis(ts).ok_or_else(|| Error::ParseError("MSSTM offset out of range".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_sum_mod_65536() {
        assert_eq!(checksum(&[0x01, 0x02, 0x03]), 6);
        assert_eq!(checksum(&[0xFF; 300]), (0xFFu32 * 300 % 65536) as u16);
    }

    #[test]
    fn sbdwb_frame_appends_big_endian_checksum() {
        let frame = encode_sbdwb_frame(&[0x01, 0x02, 0x03]);
        assert_eq!(frame, vec![0x01, 0x02, 0x03, 0x00, 0x06]);
    }

    #[test]
    fn sbdix_parses_six_fields() {
        let status = parse_sbdix("+SBDIX: 2, 43, 1, 7, 4, 2\n").unwrap();
        assert_eq!(
            status,
            SbdixStatus { mo_status: 2, momsn: 43, mt_status: 1, mtmsn: 7, mtlen: 4, mtqueued: 2 }
        );
    }

    #[test]
    fn sbdrb_round_trips_payload() {
        let payload = b"DEADBEEF".to_vec();
        let cksum = checksum(&payload);
        let mut blob = vec![0u8, payload.len() as u8];
        blob.extend_from_slice(&payload);
        blob.extend_from_slice(&cksum.to_be_bytes());

        let decoded = decode_sbdrb_frame(&blob).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn sbdrb_rejects_bad_checksum() {
        let mut blob = vec![0u8, 4, 1, 2, 3, 4, 0, 0];
        blob[6] = 0xFF;
        assert!(matches!(decode_sbdrb_frame(&blob), Err(Error::ChecksumMismatch)));
    }

    #[test]
    fn csq_parses_bar_count() {
        assert_eq!(parse_csq("+CSQ:3\r").unwrap(), 3);
        assert_eq!(parse_csq("+CSQ: 0\r").unwrap(), 0);
    }

    #[test]
    fn cclk_parses_utc_with_y2k_offset() {
        let dt = parse_cclk("+CCLK: \"24/03/05,08:09:10\"").unwrap();
        assert_eq!(dt.to_string(), "2024-03-05 08:09:10 UTC");
    }

    #[test]
    fn msstm_offsets_from_iridium_epoch() {
        let dt = parse_msstm("-MSSTM: 0\r").unwrap();
        assert_eq!(dt.timestamp(), IRIDIUM_EPOCH_UNIX);
    }
}
