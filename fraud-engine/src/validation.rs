//! Syntactic checks on submitted transactions
//!
//! Rules run in field order (amount, ip, number, region, date) and the first
//! failure is returned. Nothing is allocated for the transaction until every
//! rule has passed.

use crate::types::{RawTransaction, Region, Transaction, Verdict, DATE_FORMAT};
use crate::{Error, Result};
use chrono::NaiveDateTime;

const DATE_LEN: usize = "YYYY-MM-DDTHH:MM:SS".len();

/// Validate all fields and build a [`Transaction`]
pub fn validate_transaction(raw: &RawTransaction) -> Result<Transaction> {
    let amount = parse_amount(required("amount", &raw.amount)?)?;
    let ip = required("ip", &raw.ip)?;
    validate_ip(ip)?;
    let number = required("number", &raw.number)?;
    validate_card_number(number)?;
    let region = parse_region(required("region", &raw.region)?)?;
    let date = parse_date(required("date", &raw.date)?)?;

    Ok(Transaction {
        amount,
        ip: ip.to_string(),
        number: number.to_string(),
        region,
        date,
    })
}

fn required<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::validation(field, "missing")),
    }
}

/// Amount must be a positive integer
pub fn parse_amount(value: &str) -> Result<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::validation(
            "amount",
            format!("'{}' is not a positive integer", value),
        ));
    }
    let amount: u64 = value
        .parse()
        .map_err(|_| Error::validation("amount", format!("'{}' is out of range", value)))?;
    if amount == 0 {
        return Err(Error::validation("amount", "must be greater than zero"));
    }
    Ok(amount)
}

/// Four dot-separated decimal octets, each 0-255
pub fn validate_ip(ip: &str) -> Result<()> {
    let octets: Vec<&str> = ip.split('.').collect();
    if octets.len() != 4 {
        return Err(Error::validation("ip", format!("'{}' is not a dotted quad", ip)));
    }
    for octet in octets {
        let well_formed = !octet.is_empty()
            && octet.len() <= 3
            && octet.bytes().all(|b| b.is_ascii_digit())
            && octet.parse::<u16>().map(|n| n <= 255).unwrap_or(false);
        if !well_formed {
            return Err(Error::validation(
                "ip",
                format!("octet '{}' of '{}' is out of range", octet, ip),
            ));
        }
    }
    Ok(())
}

/// Exactly 16 digits passing the Luhn checksum
pub fn validate_card_number(number: &str) -> Result<()> {
    if number.len() != 16 || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::validation("number", "must be exactly 16 digits"));
    }
    if !luhn_valid(number) {
        return Err(Error::validation("number", "checksum mismatch"));
    }
    Ok(())
}

/// Mod-10 checksum over an all-digit string
pub fn luhn_valid(digits: &str) -> bool {
    let mut sum = 0u32;
    for (i, b) in digits.bytes().rev().enumerate() {
        if !b.is_ascii_digit() {
            return false;
        }
        let mut d = u32::from(b - b'0');
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    !digits.is_empty() && sum % 10 == 0
}

/// Region must be one of [`Region::ALL`]
pub fn parse_region(code: &str) -> Result<Region> {
    Region::from_code(code)
        .ok_or_else(|| Error::validation("region", format!("unknown region code '{}'", code)))
}

/// Full date-time with a four-digit year; a bare date is rejected
pub fn parse_date(value: &str) -> Result<NaiveDateTime> {
    let malformed = || {
        Error::validation(
            "date",
            format!("'{}' is not a date-time of the form YYYY-MM-DDTHH:MM:SS", value),
        )
    };
    // `%Y` alone also accepts signed and five-digit years.
    if value.len() != DATE_LEN || !value.bytes().take(4).all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    NaiveDateTime::parse_from_str(value, DATE_FORMAT).map_err(|_| malformed())
}

/// Reviewer feedback must name one of the three verdicts
pub fn parse_verdict(value: &str) -> Result<Verdict> {
    Verdict::from_name(value)
        .ok_or_else(|| Error::validation("feedback", format!("unknown verdict '{}'", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_raw() -> RawTransaction {
        RawTransaction::new(
            "800",
            "127.0.0.1",
            "4000008449430003",
            "ECA",
            "2022-10-13T14:34:41",
        )
    }

    fn failing_field(raw: &RawTransaction) -> &'static str {
        match validate_transaction(raw) {
            Err(Error::Validation { field, .. }) => field,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_transaction() {
        let tx = validate_transaction(&valid_raw()).unwrap();
        assert_eq!(tx.amount, 800);
        assert_eq!(tx.region, Region::Eca);
        assert_eq!(tx.date.format(DATE_FORMAT).to_string(), "2022-10-13T14:34:41");
    }

    #[test]
    fn test_luhn() {
        assert!(luhn_valid("4000008449430003"));
        assert!(luhn_valid("3151853279026036"));
        assert!(!luhn_valid("1234567891011121"));
        assert!(!luhn_valid("1234567891234567"));
    }

    #[test]
    fn test_rejects_bad_amounts() {
        for amount in ["", "0", "-5", "12a", "1.5", "99999999999999999999999"] {
            let mut raw = valid_raw();
            raw.amount = Some(amount.to_string());
            assert_eq!(failing_field(&raw), "amount", "amount {:?}", amount);
        }
        let mut raw = valid_raw();
        raw.amount = None;
        assert_eq!(failing_field(&raw), "amount");
    }

    #[test]
    fn test_rejects_bad_ips() {
        for ip in ["", "123", "1.2.3", "1.2.3.4.5", "256.0.0.1", "1..2.3", "a.b.c.d", "1.2.3.-4"] {
            let mut raw = valid_raw();
            raw.ip = Some(ip.to_string());
            assert_eq!(failing_field(&raw), "ip", "ip {:?}", ip);
        }
        assert!(validate_ip("255.255.255.255").is_ok());
        assert!(validate_ip("0.0.0.0").is_ok());
    }

    #[test]
    fn test_rejects_bad_card_numbers() {
        for number in ["1234567891011121", "400000844943000", "40000084494300031", "400000844943000x"] {
            let mut raw = valid_raw();
            raw.number = Some(number.to_string());
            assert_eq!(failing_field(&raw), "number", "number {:?}", number);
        }
    }

    #[test]
    fn test_rejects_unknown_region() {
        let mut raw = valid_raw();
        raw.region = Some("ABC".to_string());
        assert_eq!(failing_field(&raw), "region");
    }

    #[test]
    fn test_rejects_date_without_time() {
        let mut raw = valid_raw();
        raw.date = Some("2022-10-13".to_string());
        assert_eq!(failing_field(&raw), "date");
    }

    #[test]
    fn test_rejects_out_of_range_years() {
        for date in [
            "-262143-01-01T00:30:00",
            "+2022-10-13T14:34:41",
            "12022-10-13T14:34:41",
            "022-10-13T14:34:41",
        ] {
            let mut raw = valid_raw();
            raw.date = Some(date.to_string());
            assert_eq!(failing_field(&raw), "date", "date {:?}", date);
        }
        assert!(parse_date("0001-01-01T00:00:00").is_ok());
        assert!(parse_date("9999-12-31T23:59:59").is_ok());
    }

    #[test]
    fn test_first_failure_wins() {
        let mut raw = valid_raw();
        raw.ip = Some("bad".to_string());
        raw.region = Some("bad".to_string());
        assert_eq!(failing_field(&raw), "ip");
    }

    #[test]
    fn test_parse_verdict() {
        assert_eq!(parse_verdict("ALLOWED").unwrap(), Verdict::Allowed);
        assert!(matches!(
            parse_verdict("INVALID"),
            Err(Error::Validation { field: "feedback", .. })
        ));
    }
}
