use clap::CommandFactory;
use clap_complete::aot::{generate, Shell};
use std::io::BufWriter;

fn completions(shell: Shell) -> String {
    let mut buf = BufWriter::new(Vec::new());
    generate(shell, &mut juggler::cli::Cli::command(), "juggler", &mut buf);
    String::from_utf8(buf.into_inner().unwrap()).unwrap()
}

#[test]
fn bash_completions_mention_subcommands() {
    let output = completions(Shell::Bash);
    assert!(output.contains("juggler"));
    assert!(output.contains("sync"));
}

#[test]
fn zsh_completions_generate() {
    assert!(!completions(Shell::Zsh).is_empty());
}
