#[derive(Debug, Default)]
pub struct Stats {
    n_binance_rows: i32,
    n_xtb_rows: i32,
    n_output_rows: i32,
}

impl Stats {
    pub fn inc_binance(&mut self) {
        self.n_binance_rows += 1;
    }

    pub fn inc_xtb(&mut self) {
        self.n_xtb_rows += 1;
    }

    pub fn add_output(&mut self, n: usize) {
        self.n_output_rows += n as i32;
    }

    pub fn pretty_print(&self) {
        eprintln!("{self:#?}");
        eprintln!();
    }
}
