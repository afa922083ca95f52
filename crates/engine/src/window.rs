// In crates/engine/src/window.rs

use chrono::{DateTime, Utc};
use core_types::{PricePoint, Symbol};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Ring buffer of the most recent prices of one instrument, oldest first.
#[derive(Debug)]
struct InstrumentWindow {
    points: VecDeque<PricePoint>,
    capacity: usize,
}

impl InstrumentWindow {
    fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, point: PricePoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }
}

/// Bounded per-instrument price history shared by every ingestion worker.
///
/// Windows are created on the first sample for a symbol and live as long as
/// the store. The store keeps arrival order and never re-sorts by timestamp.
#[derive(Debug)]
pub struct PriceWindowStore {
    capacity: usize,
    windows: Mutex<HashMap<Symbol, InstrumentWindow>>,
}

impl PriceWindowStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Appends a sample, evicting the oldest one if the window is full.
    pub fn record(&self, symbol: &Symbol, timestamp: DateTime<Utc>, price: f64) {
        let mut windows = self.windows.lock();
        self.window_mut(&mut windows, symbol)
            .push(PricePoint::new(timestamp, price));
    }

    /// Appends a sample and returns the resulting window in one critical section.
    pub fn record_and_snapshot(&self, symbol: &Symbol, timestamp: DateTime<Utc>, price: f64) -> Vec<f64> {
        let mut windows = self.windows.lock();
        let window = self.window_mut(&mut windows, symbol);
        window.push(PricePoint::new(timestamp, price));
        window.prices()
    }

    fn window_mut<'a>(
        &self,
        windows: &'a mut HashMap<Symbol, InstrumentWindow>,
        symbol: &Symbol,
    ) -> &'a mut InstrumentWindow {
        windows
            .entry(symbol.clone())
            .or_insert_with(|| InstrumentWindow::new(self.capacity))
    }

    /// A copy of the current prices, oldest first. Empty for an unknown symbol.
    pub fn snapshot(&self, symbol: &Symbol) -> Vec<f64> {
        self.windows
            .lock()
            .get(symbol)
            .map(InstrumentWindow::prices)
            .unwrap_or_default()
    }

    pub fn len(&self, symbol: &Symbol) -> usize {
        self.windows.lock().get(symbol).map_or(0, |w| w.points.len())
    }

    /// Symbols that have received at least one sample.
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.windows.lock().keys().cloned().collect();
        symbols.sort();
        symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn eur() -> Symbol {
        Symbol::from("EUR/USD")
    }

    #[test]
    fn keeps_only_the_last_capacity_points_in_order() {
        let store = PriceWindowStore::new(120);
        let now = Utc::now();
        for i in 0..130 {
            store.record(&eur(), now, i as f64);
        }

        let prices = store.snapshot(&eur());
        assert_eq!(prices.len(), 120);
        let expected: Vec<f64> = (10..130).map(|i| i as f64).collect();
        assert_eq!(prices, expected);
    }

    #[test]
    fn unknown_symbol_has_an_empty_window() {
        let store = PriceWindowStore::new(120);
        assert!(store.snapshot(&eur()).is_empty());
        assert_eq!(store.len(&eur()), 0);
    }

    #[test]
    fn windows_are_created_lazily_and_independent() {
        let store = PriceWindowStore::new(3);
        let now = Utc::now();
        let jpy = Symbol::from("USD/JPY");

        store.record(&eur(), now, 1.1);
        store.record(&jpy, now, 151.0);
        store.record(&eur(), now, 1.2);

        assert_eq!(store.snapshot(&eur()), vec![1.1, 1.2]);
        assert_eq!(store.snapshot(&jpy), vec![151.0]);
        assert_eq!(store.symbols(), vec![eur(), jpy]);
    }

    #[test]
    fn record_and_snapshot_includes_the_new_point() {
        let store = PriceWindowStore::new(2);
        let now = Utc::now();
        store.record(&eur(), now, 1.0);
        store.record(&eur(), now, 2.0);

        assert_eq!(store.record_and_snapshot(&eur(), now, 3.0), vec![2.0, 3.0]);
        assert_eq!(store.snapshot(&eur()), vec![2.0, 3.0]);
    }

    #[test]
    fn concurrent_writers_never_overflow_a_window() {
        let store = Arc::new(PriceWindowStore::new(120));
        let now = Utc::now();

        std::thread::scope(|scope| {
            for writer in 0..4 {
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    for i in 0..500 {
                        let prices = store.record_and_snapshot(&eur(), now, (writer * 1000 + i) as f64);
                        assert!(prices.len() <= 120);
                    }
                });
            }
        });

        assert_eq!(store.len(&eur()), 120);
    }
}
