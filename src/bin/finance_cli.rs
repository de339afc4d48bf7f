use finance_core::cli::{output, run_cli};

fn main() {
    if let Err(err) = run_cli() {
        output::error(err);
        std::process::exit(1);
    }
}
