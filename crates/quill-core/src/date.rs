//! Date-like inputs accepted by date comparisons.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};

use crate::error::{DatabaseError, Result};

/// Normalizes a date-like input to a calendar date.
pub trait ToSqlDate {
    /// Returns the calendar date this input denotes.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidArgument`] when the input is not a
    /// `Y-m-d` date or the timestamp is out of range.
    fn to_sql_date(&self) -> Result<NaiveDate>;
}

impl ToSqlDate for NaiveDate {
    fn to_sql_date(&self) -> Result<NaiveDate> {
        Ok(*self)
    }
}

impl ToSqlDate for NaiveDateTime {
    fn to_sql_date(&self) -> Result<NaiveDate> {
        Ok(self.date())
    }
}

impl<Tz: TimeZone> ToSqlDate for DateTime<Tz> {
    fn to_sql_date(&self) -> Result<NaiveDate> {
        Ok(self.date_naive())
    }
}

/// Unix timestamp in seconds, taken as UTC.
impl ToSqlDate for i64 {
    fn to_sql_date(&self) -> Result<NaiveDate> {
        DateTime::from_timestamp(*self, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| {
                DatabaseError::InvalidArgument(format!("timestamp out of range: {self}"))
            })
    }
}

impl ToSqlDate for str {
    fn to_sql_date(&self) -> Result<NaiveDate> {
        let s = self.trim();
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
            .map_err(|_| DatabaseError::InvalidArgument(format!("not a Y-m-d date: '{s}'")))
    }
}

impl ToSqlDate for &str {
    fn to_sql_date(&self) -> Result<NaiveDate> {
        (**self).to_sql_date()
    }
}

impl ToSqlDate for String {
    fn to_sql_date(&self) -> Result<NaiveDate> {
        self.as_str().to_sql_date()
    }
}
