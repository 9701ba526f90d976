// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print as JSON lines"),
    )
}

fn required(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).required(true).help(help)
}

fn id_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .required(true)
        .value_parser(value_parser!(i64))
        .help(help)
}

pub fn build_cli() -> Command {
    Command::new("pocketledger")
        .about("Local-first multi-device ledger with package-based sync")
        .version(clap::crate_version!())
        .subcommand(Command::new("init").about("Create the database if needed"))
        .subcommand(
            Command::new("currency")
                .about("Manage currencies")
                .subcommand(
                    Command::new("add")
                        .arg(required("code", "ISO code, e.g. USD"))
                        .arg(required("name", "Display name"))
                        .arg(Arg::new("symbol").long("symbol").default_value(""))
                        .arg(
                            Arg::new("decimals")
                                .long("decimals")
                                .value_parser(value_parser!(i64))
                                .default_value("2"),
                        ),
                )
                .subcommand(Command::new("list")),
        )
        .subcommand(
            Command::new("tag")
                .about("Manage the tag hierarchy")
                .subcommand(
                    Command::new("add").arg(required("name", "Tag name")).arg(
                        Arg::new("parent")
                            .long("parent")
                            .action(ArgAction::Append)
                            .value_parser(value_parser!(i64))
                            .help("Parent tag id (repeatable)"),
                    ),
                )
                .subcommand(
                    Command::new("link")
                        .arg(id_arg("parent", "Parent tag id"))
                        .arg(id_arg("child", "Child tag id")),
                )
                .subcommand(Command::new("list")),
        )
        .subcommand(
            Command::new("wallet")
                .about("Manage wallets")
                .subcommand(
                    Command::new("add").arg(required("name", "Wallet name")).arg(
                        Arg::new("color")
                            .long("color")
                            .value_parser(value_parser!(i64))
                            .default_value("0"),
                    ),
                )
                .subcommand(
                    Command::new("rename")
                        .arg(id_arg("id", "Wallet id"))
                        .arg(required("name", "New name")),
                )
                .subcommand(Command::new("list")),
        )
        .subcommand(
            Command::new("account")
                .about("Manage accounts")
                .subcommand(
                    Command::new("add")
                        .arg(id_arg("wallet", "Owning wallet id"))
                        .arg(id_arg("currency", "Currency id"))
                        .arg(
                            Arg::new("initial")
                                .long("initial")
                                .allow_hyphen_values(true)
                                .help("Initial balance, recorded as a transaction"),
                        ),
                )
                .subcommand(json_flags(Command::new("list"))),
        )
        .subcommand(
            Command::new("counterparty")
                .about("Manage counterparties")
                .subcommand(
                    Command::new("add")
                        .arg(required("name", "Counterparty name"))
                        .arg(Arg::new("note").long("note")),
                ),
        )
        .subcommand(
            Command::new("tx")
                .about("Record and list transactions")
                .subcommand(
                    Command::new("add")
                        .arg(id_arg("account", "Account id"))
                        .arg(
                            Arg::new("amount")
                                .long("amount")
                                .required(true)
                                .allow_hyphen_values(true)
                                .help("Signed amount, e.g. -12.50"),
                        )
                        .arg(
                            Arg::new("tag")
                                .long("tag")
                                .value_parser(value_parser!(i64))
                                .default_value("10"),
                        )
                        .arg(
                            Arg::new("counterparty")
                                .long("counterparty")
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(Arg::new("note").long("note"))
                        .arg(
                            Arg::new("at")
                                .long("at")
                                .help("Unix seconds or YYYY-MM-DD (default: now)"),
                        ),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(
                            Arg::new("account")
                                .long("account")
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        ),
                )),
        )
        .subcommand(
            Command::new("budget").about("Manage budgets").subcommand(
                Command::new("add")
                    .arg(id_arg("tag", "Tag id"))
                    .arg(required("amount", "Budgeted amount in minor units"))
                    .arg(required("start", "Window start (inclusive)"))
                    .arg(required("end", "Window end (exclusive)")),
            ),
        )
        .subcommand(
            Command::new("rm")
                .about("Delete a row and record a tombstone")
                .arg(Arg::new("kind").required(true).help("icon, currency, tag, wallet, account, counterparty, transaction, budget"))
                .arg(Arg::new("id").required(true)),
        )
        .subcommand(
            Command::new("sync")
                .about("Exchange sync packages with other devices")
                .subcommand(
                    Command::new("export")
                        .arg(
                            Arg::new("since")
                                .long("since")
                                .default_value("0")
                                .help("Watermark (Unix seconds or YYYY-MM-DD), inclusive"),
                        )
                        .arg(required("out", "Package file to write"))
                        .arg(Arg::new("sender").long("sender").help("Sender id (default: this installation)")),
                )
                .subcommand(Command::new("import").arg(required("path", "Package file to merge")))
                .subcommand(
                    Command::new("push")
                        .arg(required("to", "Remote installation id"))
                        .arg(required("out", "Package file to write")),
                )
                .subcommand(json_flags(Command::new("state"))),
        )
        .subcommand(
            Command::new("doctor")
                .about("Check balances and line references")
                .arg(
                    Arg::new("fix")
                        .long("fix")
                        .action(ArgAction::SetTrue)
                        .help("Recompute every account balance"),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        build_cli().debug_assert();
    }
}
