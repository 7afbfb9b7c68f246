//! Interactive lab shell.
//!
//! Minimal stdin REPL: `<node> <command...>` executes the command inside the
//! node's namespace and prints its output. Arguments are whitespace-split;
//! there is no quoting.

use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::topology::Lab;

const PROMPT: &str = "ospflab> ";

pub fn run(lab: &Lab) -> Result<()> {
    println!("Entering lab shell. Try 'pc1 ping -c 3 172.16.5.10'. 'exit' leaves.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        stdout.write_all(PROMPT.as_bytes())?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            println!();
            return Ok(());
        }

        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            continue;
        };

        match first {
            "exit" | "quit" => return Ok(()),
            "help" => {
                println!("commands:");
                println!("  <node> <command...>  run a command inside the node's namespace");
                println!("  nodes                list node names");
                println!("  exit                 leave the shell (daemons are then stopped)");
            }
            "nodes" => println!("{}", lab.node_names().join(" ")),
            node => {
                let Some(ns) = lab.namespace(node) else {
                    println!("unknown node '{node}' (see 'nodes')");
                    continue;
                };
                let args: Vec<&str> = tokens.collect();
                let Some((cmd, cmd_args)) = args.split_first() else {
                    println!("usage: {node} <command...>");
                    continue;
                };
                match ns.exec(cmd, cmd_args) {
                    Ok(out) => {
                        print!("{}", String::from_utf8_lossy(&out.stdout));
                        eprint!("{}", String::from_utf8_lossy(&out.stderr));
                    }
                    Err(err) => println!("error: {err:#}"),
                }
            }
        }
    }
}
