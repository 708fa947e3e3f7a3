use std::iter;

use chrono::{
  Datelike,
  Duration,
  NaiveDate
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum CalendarCell {
  Empty,
  Day(NaiveDate)
}

impl CalendarCell {
  #[must_use]
  pub fn date(&self) -> Option<NaiveDate> {
    match self {
      | CalendarCell::Empty => None,
      | CalendarCell::Day(date) => {
        Some(*date)
      }
    }
  }

  /// `YYYY-MM-DD` for the booking form's
  /// `puja_date` field.
  #[must_use]
  pub fn iso_date(&self) -> Option<String> {
    self.date().map(|date| {
      date.format("%Y-%m-%d").to_string()
    })
  }
}

/// Cells for a month view: one `Empty` per
/// weekday column before the 1st (Sunday
/// first), then every day of the month.
/// The last row is left ragged.
///
/// `month0` is 0-indexed and may overflow
/// into neighbouring years.
#[must_use]
pub fn month_grid(
  year: i32,
  month0: i32
) -> Vec<CalendarCell> {
  let (year, month) =
    normalize_month(year, month0);
  let first =
    first_day_of_month(year, month);
  let offset = first
    .weekday()
    .num_days_from_sunday()
    as usize;
  let days = days_in_month(year, month);

  let mut cells = Vec::with_capacity(
    offset + days as usize
  );
  cells.extend(iter::repeat_n(
    CalendarCell::Empty,
    offset
  ));
  cells.extend((1..=days).filter_map(
    |day| {
      NaiveDate::from_ymd_opt(
        year, month, day
      )
      .map(CalendarCell::Day)
    }
  ));
  cells
}

/// Month currently shown by a calendar
/// widget.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct CalendarMonth {
  year:  i32,
  month: u32
}

impl CalendarMonth {
  #[must_use]
  pub fn new(
    year: i32,
    month0: i32
  ) -> Self {
    let (year, month) =
      normalize_month(year, month0);
    Self {
      year,
      month
    }
  }

  #[must_use]
  pub fn containing(
    date: NaiveDate
  ) -> Self {
    Self {
      year:  date.year(),
      month: date.month()
    }
  }

  #[must_use]
  pub fn year(&self) -> i32 {
    self.year
  }

  /// 1-indexed month.
  #[must_use]
  pub fn month(&self) -> u32 {
    self.month
  }

  #[must_use]
  pub fn month0(&self) -> i32 {
    self.month as i32 - 1
  }

  #[must_use]
  pub fn prev(&self) -> Self {
    Self::new(
      self.year,
      self.month0() - 1
    )
  }

  #[must_use]
  pub fn next(&self) -> Self {
    Self::new(
      self.year,
      self.month0() + 1
    )
  }

  #[must_use]
  pub fn first_day(&self) -> NaiveDate {
    first_day_of_month(
      self.year, self.month
    )
  }

  #[must_use]
  pub fn last_day(&self) -> NaiveDate {
    last_day_of_month(
      self.year, self.month
    )
  }

  #[must_use]
  pub fn contains(
    &self,
    date: NaiveDate
  ) -> bool {
    date.year() == self.year
      && date.month() == self.month
  }

  #[must_use]
  pub fn title(&self) -> String {
    self
      .first_day()
      .format("%B %Y")
      .to_string()
  }

  #[must_use]
  pub fn cells(
    &self
  ) -> Vec<CalendarCell> {
    month_grid(self.year, self.month0())
  }

  #[must_use]
  pub fn rows(
    &self
  ) -> Vec<Vec<CalendarCell>> {
    self
      .cells()
      .chunks(7)
      .map(<[CalendarCell]>::to_vec)
      .collect()
  }
}

fn normalize_month(
  year: i32,
  month0: i32
) -> (i32, u32) {
  let year = year
    .saturating_add(month0.div_euclid(12));
  let month =
    month0.rem_euclid(12) as u32 + 1;
  (year, month)
}

fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  let first_of_next = first_day_of_month(
    next_year, next_month
  );
  first_of_next
    .checked_sub_signed(Duration::days(1))
    .unwrap_or(first_of_next)
}

fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}
