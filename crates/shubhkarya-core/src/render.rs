use std::collections::{BTreeMap, BTreeSet};
use std::io::{IsTerminal, Write};

use chrono::{Datelike, NaiveDate};
use shubhkarya_shared::{BookingRecord, Devotee, Pandit, Pooja, Service};
use unicode_width::UnicodeWidthStr;

use crate::calendar::{CalendarCell, CalendarMonth};
use crate::config::Config;
use crate::status::StatusBucket;
use crate::views::FlashMessage;

const BAR_WIDTH: usize = 40;
const WEEKDAYS: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.display.color && std::io::stdout().is_terminal(),
        }
    }

    /// No escape codes at all.
    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all, fields(rows = records.len()))]
    pub fn booking_table<W: Write>(
        &self,
        out: &mut W,
        records: &[&BookingRecord],
    ) -> anyhow::Result<()> {
        let headers = [
            "ID", "Date", "Time", "Pandit", "Devotee", "Service", "Location", "Status",
        ];

        let rows = records
            .iter()
            .map(|b| {
                let bucket = StatusBucket::normalize(b.status.as_deref());
                vec![
                    self.paint(&b.id, "33"),
                    b.resolved_date().map(date_part).unwrap_or("-").to_string(),
                    b.puja_time.clone().unwrap_or_default(),
                    b.pandit_name().to_string(),
                    b.devotee_name().to_string(),
                    b.service_name().to_string(),
                    b.location.clone().unwrap_or_default(),
                    self.paint(&b.status_label(), status_color(&bucket)),
                ]
            })
            .collect();

        write_table(out, &headers, rows)
    }

    pub fn status_counts<W: Write>(
        &self,
        out: &mut W,
        counts: &BTreeMap<StatusBucket, usize>,
    ) -> anyhow::Result<()> {
        if counts.is_empty() {
            writeln!(out, "no bookings")?;
            return Ok(());
        }
        let width = counts
            .keys()
            .map(|b| UnicodeWidthStr::width(b.as_key()))
            .max()
            .unwrap_or(0);
        for (bucket, count) in counts {
            let label = format!("{:<width$}", bucket.as_key());
            writeln!(out, "{}  {count}", self.paint(&label, status_color(bucket)))?;
        }
        Ok(())
    }

    /// Horizontal bars scaled so the largest count fills the full width.
    pub fn bar_chart<W: Write>(
        &self,
        out: &mut W,
        title: &str,
        series: &[(String, usize)],
    ) -> anyhow::Result<()> {
        writeln!(out, "{title}")?;
        if series.is_empty() {
            writeln!(out, "  (no dated bookings)")?;
            return Ok(());
        }

        let max = series.iter().map(|(_, count)| *count).max().unwrap_or(0).max(1);
        let label_width = series
            .iter()
            .map(|(key, _)| UnicodeWidthStr::width(key.as_str()))
            .max()
            .unwrap_or(0);

        for (key, count) in series {
            let len = (count * BAR_WIDTH).div_ceil(max);
            let bar = self.paint(&"#".repeat(len), "36");
            writeln!(out, "  {key:<label_width$} | {bar} {count}")?;
        }
        Ok(())
    }

    /// Month grid, Sunday first. Booked days carry a `*`, today is bracketed.
    pub fn calendar<W: Write>(
        &self,
        out: &mut W,
        month: &CalendarMonth,
        booked: &BTreeSet<NaiveDate>,
        today: Option<NaiveDate>,
    ) -> anyhow::Result<()> {
        writeln!(out, "{:^34}", month.title())?;
        for day in WEEKDAYS {
            write!(out, " {day:>3} ")?;
        }
        writeln!(out)?;

        for row in month.rows() {
            for cell in row {
                match cell {
                    CalendarCell::Empty => write!(out, "     ")?,
                    CalendarCell::Day(date) => {
                        let day = date.day();
                        let mark = if booked.contains(&date) { "*" } else { " " };
                        let text = if Some(date) == today {
                            format!("[{day:>2}]")
                        } else {
                            format!(" {day:>2} ")
                        };
                        let text = if booked.contains(&date) {
                            self.paint(&text, "32")
                        } else {
                            text
                        };
                        write!(out, "{text}{mark}")?;
                    }
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }

    pub fn pandit_table<W: Write>(
        &self,
        out: &mut W,
        pandits: &[&Pandit],
        photo: impl Fn(&Pandit) -> String,
    ) -> anyhow::Result<()> {
        let headers = [
            "ID", "Name", "City", "Experience", "Languages", "Specialties", "Verified", "Photo",
        ];
        let rows = pandits
            .iter()
            .map(|p| {
                let verified = if p.is_verified {
                    self.paint("yes", "32")
                } else {
                    self.paint("pending", "33")
                };
                vec![
                    p.id.clone(),
                    p.name.clone(),
                    p.city.clone().unwrap_or_default(),
                    p.experience_text().unwrap_or_default(),
                    p.languages.join(", "),
                    p.specialties.join(", "),
                    verified,
                    photo(p),
                ]
            })
            .collect();
        write_table(out, &headers, rows)
    }

    pub fn devotee_table<W: Write>(&self, out: &mut W, devotees: &[&Devotee]) -> anyhow::Result<()> {
        let headers = ["ID", "Name", "Email", "Phone", "City", "Address"];
        let rows = devotees
            .iter()
            .map(|d| {
                vec![
                    d.id.clone(),
                    d.name.clone().unwrap_or_default(),
                    d.email.clone().unwrap_or_default(),
                    d.phone.clone().unwrap_or_default(),
                    d.city.clone().unwrap_or_default(),
                    d.address.clone().unwrap_or_default(),
                ]
            })
            .collect();
        write_table(out, &headers, rows)
    }

    pub fn pooja_table<W: Write>(&self, out: &mut W, poojas: &[&Pooja]) -> anyhow::Result<()> {
        let headers = ["ID", "Name", "Description", "Image"];
        let rows = poojas
            .iter()
            .map(|p| {
                vec![
                    p.id.clone(),
                    p.name.clone().unwrap_or_default(),
                    p.description.clone().unwrap_or_default(),
                    p.image_url.clone().unwrap_or_default(),
                ]
            })
            .collect();
        write_table(out, &headers, rows)
    }

    pub fn service_table<W: Write>(&self, out: &mut W, services: &[Service]) -> anyhow::Result<()> {
        let headers = ["Service", "Description"];
        let rows = services
            .iter()
            .map(|s| vec![s.name.clone(), s.description.clone().unwrap_or_default()])
            .collect();
        write_table(out, &headers, rows)
    }

    /// Aligned `label  value` lines.
    pub fn key_values<W: Write>(&self, out: &mut W, pairs: &[(&str, String)]) -> anyhow::Result<()> {
        let width = pairs
            .iter()
            .map(|(label, _)| UnicodeWidthStr::width(*label))
            .max()
            .unwrap_or(0);
        for (label, value) in pairs {
            writeln!(out, "{label:<width$}  {value}")?;
        }
        Ok(())
    }

    pub fn flash<W: Write>(&self, out: &mut W, message: &FlashMessage) -> anyhow::Result<()> {
        let text = if message.is_error() {
            self.paint(&message.text, "31")
        } else {
            self.paint(&message.text, "32")
        };
        writeln!(out, "{text}")?;
        Ok(())
    }

    pub fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn status_color(bucket: &StatusBucket) -> &'static str {
    match bucket {
        StatusBucket::Pending => "33",
        StatusBucket::Confirmed => "32",
        StatusBucket::Completed => "36",
        StatusBucket::Cancelled | StatusBucket::Rejected => "31",
        StatusBucket::Unknown | StatusBucket::Other(_) => "90",
    }
}

/// Timestamps show as their date only.
fn date_part(raw: &str) -> &str {
    raw.get(..10).unwrap_or(raw)
}

fn write_table<W: Write>(
    writer: &mut W,
    headers: &[&str],
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(*header));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
