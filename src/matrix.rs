use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::config::{BANK_ISOLATION_US, COLS, ROWS, ROW_SETTLE_US};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Bank {
    /// Closes first, start of the key travel
    First,
    /// Closes deeper in the travel
    Second,
}

/// Pin configuration selected by the power manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum PinProfile {
    /// Rows idle high, one row at a time driven low while sampling
    Scan,
    /// Every row driven low so any closed contact holds its column low
    WakeSense,
}

/// Both contact banks of one row, indexed by column
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RowSample {
    pub first: [bool; COLS],
    pub second: [bool; COLS],
}

/// Rows idle high. A closed contact pulls its column low while its row is low.
pub trait MatrixIo {
    /// Columns of `row` in `bank`, `true` for a closed contact.
    fn sample_bank(&mut self, bank: Bank, row: usize) -> [bool; COLS];

    fn pause_us(&mut self, us: u32);

    fn apply_profile(&mut self, profile: PinProfile);

    fn sample_row(&mut self, row: usize) -> RowSample {
        let first = self.sample_bank(Bank::First, row);
        self.pause_us(BANK_ISOLATION_US);
        let second = self.sample_bank(Bank::Second, row);

        RowSample { first, second }
    }
}

pub struct Matrix<R, C, D> {
    rows1: [R; ROWS],
    rows2: [R; ROWS],
    cols: [C; COLS],
    delay: D,
}

impl<R: OutputPin, C: InputPin, D: DelayNs> Matrix<R, C, D> {
    pub fn init(rows1: [R; ROWS], rows2: [R; ROWS], cols: [C; COLS], delay: D) -> Self {
        let mut matrix = Self { rows1, rows2, cols, delay };
        matrix.apply_profile(PinProfile::Scan);
        matrix
    }

    fn bank_rows(&mut self, bank: Bank) -> &mut [R; ROWS] {
        match bank {
            Bank::First => &mut self.rows1,
            Bank::Second => &mut self.rows2,
        }
    }
}

impl<R: OutputPin, C: InputPin, D: DelayNs> MatrixIo for Matrix<R, C, D> {
    fn sample_bank(&mut self, bank: Bank, row: usize) -> [bool; COLS] {
        let mut closed = [false; COLS];

        // nRF pins are infallible, a failed read counts as open
        let _ = self.bank_rows(bank)[row].set_low();
        self.delay.delay_us(ROW_SETTLE_US);

        for (state, col) in closed.iter_mut().zip(self.cols.iter_mut()) {
            *state = col.is_low().unwrap_or(false);
        }

        let _ = self.bank_rows(bank)[row].set_high();
        closed
    }

    fn pause_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn apply_profile(&mut self, profile: PinProfile) {
        for row in self.rows1.iter_mut().chain(self.rows2.iter_mut()) {
            let _ = match profile {
                PinProfile::Scan => row.set_high(),
                PinProfile::WakeSense => row.set_low(),
            };
        }

        #[cfg(feature = "debug")]
        debug!("[matrix] pin profile {:?}", profile);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    /// Row lines of both banks, `true` while high. Bank 2 rows follow bank 1.
    type Lines = Rc<RefCell<[bool; 2 * ROWS]>>;

    struct FakeRow {
        line: usize,
        lines: Lines,
    }

    impl embedded_hal::digital::ErrorType for FakeRow {
        type Error = Infallible;
    }

    impl OutputPin for FakeRow {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.lines.borrow_mut()[self.line] = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.lines.borrow_mut()[self.line] = true;
            Ok(())
        }
    }

    struct FakeCol {
        col: usize,
        lines: Lines,
        /// Closed contacts as (row line, column)
        closed: Rc<Vec<(usize, usize)>>,
    }

    impl embedded_hal::digital::ErrorType for FakeCol {
        type Error = Infallible;
    }

    impl InputPin for FakeCol {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            self.is_low().map(|low| !low)
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            let lines = self.lines.borrow();
            Ok(self
                .closed
                .iter()
                .any(|&(line, col)| col == self.col && !lines[line]))
        }
    }

    #[derive(Default, Clone)]
    struct FakeDelay(Rc<RefCell<u64>>);

    impl DelayNs for FakeDelay {
        fn delay_ns(&mut self, ns: u32) {
            *self.0.borrow_mut() += ns as u64;
        }
    }

    fn matrix(
        closed: Vec<(usize, usize)>,
    ) -> (Matrix<FakeRow, FakeCol, FakeDelay>, Lines, FakeDelay) {
        let lines: Lines = Rc::new(RefCell::new([false; 2 * ROWS]));
        let closed = Rc::new(closed);
        let delay = FakeDelay::default();

        let rows1 = core::array::from_fn(|r| FakeRow { line: r, lines: lines.clone() });
        let rows2 = core::array::from_fn(|r| FakeRow { line: ROWS + r, lines: lines.clone() });
        let cols = core::array::from_fn(|c| FakeCol {
            col: c,
            lines: lines.clone(),
            closed: closed.clone(),
        });

        (Matrix::init(rows1, rows2, cols, delay.clone()), lines, delay)
    }

    #[test]
    fn init_drives_every_row_high() {
        let (_, lines, _) = matrix(Vec::new());
        assert!(lines.borrow().iter().all(|&high| high));
    }

    #[test]
    fn reads_only_the_selected_row_and_bank() {
        // row 2 col 1 contact 2, row 4 col 3 contact 1
        let (mut matrix, lines, _) = matrix(vec![(ROWS + 2, 1), (4, 3)]);

        assert_eq!(matrix.sample_bank(Bank::Second, 2), [false, true, false, false]);
        assert_eq!(matrix.sample_bank(Bank::First, 2), [false; COLS]);
        assert_eq!(matrix.sample_bank(Bank::First, 4), [false, false, false, true]);
        assert_eq!(matrix.sample_bank(Bank::Second, 4), [false; COLS]);

        // rows are restored after every sample
        assert!(lines.borrow().iter().all(|&high| high));
    }

    #[test]
    fn row_sample_honours_settle_and_isolation() {
        let (mut matrix, _, delay) = matrix(vec![(0, 0), (ROWS, 0)]);
        let start = *delay.0.borrow();

        let sample = matrix.sample_row(0);
        assert_eq!(sample.first, [true, false, false, false]);
        assert_eq!(sample.second, [true, false, false, false]);

        let waited_us = (*delay.0.borrow() - start) / 1_000;
        assert!(waited_us >= (2 * ROW_SETTLE_US + BANK_ISOLATION_US) as u64);
    }

    #[test]
    fn wake_profile_pulls_every_row_low() {
        let (mut matrix, lines, _) = matrix(Vec::new());

        matrix.apply_profile(PinProfile::WakeSense);
        assert!(lines.borrow().iter().all(|&high| !high));

        matrix.apply_profile(PinProfile::Scan);
        assert!(lines.borrow().iter().all(|&high| high));
    }
}
