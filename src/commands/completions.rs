//! Shell completion scripts

use clap::CommandFactory;
use clap_complete::{Shell, generate};
use eyre::Result;
use std::io::{self, Write};

use crate::cli::Cli;

pub fn run(shell: Shell) -> Result<()> {
    let mut stdout = io::stdout().lock();
    write_completions(shell, &mut stdout);
    stdout.flush()?;
    Ok(())
}

fn write_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, out);
}
