//! Interactive banking shell.

use std::fs;
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use warden::{Realm, RealmError, RemovalPolicy};
use warden_config::WardenConfig;
use warden_rbac::{Capability, Role};
use warden_session::{Credential, Principal, SessionEnd};
use warden_store::Record;
use warden_types::{CollectionName, PrincipalId, RecordKey, Timestamp};
use zeroize::Zeroizing;

use crate::bank::{self, Account, AccountKind, parse_decimal};
use crate::style::colors::SemanticStyle;
use crate::style::{print_error, print_hint, print_info_table, print_rows, print_success, print_warn};

/// Shell prompt.
const PROMPT: &str = "warden> ";

/// Help text for the shell.
const HELP_TEXT: &str = r"
Warden banking shell

Session:
  login <id> <secret>                 Log in
  logout                              Log out
  whoami                              Show the current principal

Accounts:
  open <key> <holder> [kind]          Open an account (kind: plain | savings <rate> | checking <overdraft>)
  deposit <key> <amount>              Deposit money
  withdraw <key> <amount>             Withdraw money
  transfer <from> <to> <amount>       Move money between accounts
  interest <key>                      Apply interest to a savings account
  show <key>                          Show one account
  list                                List all accounts
  history <key>                       Show an account's audit trail
  close <key>                         Close an account
  export [path]                       Export accounts with history as JSON

Administration:
  users                               List principals
  adduser <id> <role> <secret> [name] Create a principal
  role <id> <role>                    Change a principal's role
  activate <id> | deactivate <id>     Enable or disable a principal
  rmuser <id> [restrict|cascade]      Remove a principal

  help                                Show this help message
  exit                                Exit the shell
";

/// What the loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub fn run(config: &WardenConfig) -> Result<()> {
    let mut shell = Shell::new(config)?;
    tracing::debug!(realm = shell.realm.name(), collection = %shell.accounts, "shell started");

    println!("{}", "Warden banking shell".header());
    println!("Realm:      {}", shell.realm.name());
    println!("Collection: {}", shell.accounts);
    println!();
    print_hint("Type help for commands, exit to quit.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{PROMPT}");
        stdout.flush()?;

        // The line may carry a secret.
        let mut line = Zeroizing::new(String::new());
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                println!();
                println!("Goodbye!");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                print_error(&format!("Error reading input: {e}"));
                continue;
            }
        }

        if shell.execute(line.trim()) == Flow::Exit {
            break;
        }
    }

    Ok(())
}

/// A realm of bank accounts driven by text commands.
pub struct Shell {
    realm: Realm<Account>,
    accounts: CollectionName,
}

impl Shell {
    pub fn new(config: &WardenConfig) -> Result<Self> {
        let policy = bank::banking_policy(config.access_policy()?);
        let realm = Realm::from_config(config)
            .context("Failed to set up realm")?
            .with_policy(policy);
        Ok(Self {
            realm,
            accounts: config.default_collection()?,
        })
    }

    /// Runs one command line and prints its outcome. Errors are reported,
    /// never propagated: the shell keeps running.
    pub fn execute(&mut self, line: &str) -> Flow {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            return Flow::Continue;
        };

        let result = match command.to_lowercase().as_str() {
            "help" | "?" => {
                println!("{HELP_TEXT}");
                Ok(())
            }
            "exit" | "quit" => {
                println!("Goodbye!");
                return Flow::Exit;
            }
            "login" => self.login(args),
            "logout" => {
                self.logout();
                Ok(())
            }
            "whoami" => {
                self.whoami();
                Ok(())
            }
            "open" => self.open(args),
            "deposit" => self.deposit(args),
            "withdraw" => self.withdraw(args),
            "transfer" => self.transfer(args),
            "interest" => self.interest(args),
            "show" => self.show(args),
            "list" => self.list(),
            "history" => self.history(args),
            "close" => self.close(args),
            "export" => self.export(args),
            "users" => self.users(),
            "adduser" => self.add_user(args),
            "role" => self.set_role(args),
            "activate" => self.set_active(args, true),
            "deactivate" => self.set_active(args, false),
            "rmuser" => self.remove_user(args),
            other => Err(anyhow!("Unknown command: {other}. Type help for available commands.")),
        };

        if let Err(e) = result {
            print_error(&e.to_string());
        }
        Flow::Continue
    }

    // ------------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------------

    fn login(&mut self, args: &[&str]) -> Result<()> {
        let [id, secret] = args else {
            bail!("usage: login <id> <secret>");
        };
        let secret = Zeroizing::new((*secret).to_string());
        let principal = self.realm.login(&PrincipalId::parse(id)?, &secret)?;
        print_success(&format!(
            "Logged in as {} ({}), role {}",
            principal.display_name(),
            principal.id(),
            principal.role()
        ));
        Ok(())
    }

    fn logout(&mut self) {
        match self.realm.logout() {
            SessionEnd::Ended(principal) => {
                print_success(&format!("{} logged out", principal.id()));
            }
            SessionEnd::NoActiveSession => print_warn("No active session"),
        }
    }

    fn whoami(&self) {
        match self.realm.current() {
            Some(p) => print_info_table(&principal_entries(p)),
            None => print_warn("Not logged in"),
        }
    }

    // ------------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------------

    fn open(&mut self, args: &[&str]) -> Result<()> {
        let [key, holder, kind @ ..] = args else {
            bail!("usage: open <key> <holder> [plain | savings <rate> | checking <overdraft>]");
        };
        let kind = AccountKind::parse(kind).map_err(|e| anyhow!(e))?;
        let officer = self.realm.current().map(|p| p.id().clone());
        let key = RecordKey::parse(key)?;
        self.realm
            .create(&self.accounts, key.clone(), Account::open(*holder, kind, officer))?;
        print_success(&format!("Opened account {key} for {holder}"));
        Ok(())
    }

    fn deposit(&mut self, args: &[&str]) -> Result<()> {
        let (key, amount) = key_and_amount(args, "deposit")?;
        self.realm
            .update(&self.accounts, &key, |a| a.deposit(amount))?;
        self.report_balance(&key)
    }

    fn withdraw(&mut self, args: &[&str]) -> Result<()> {
        let (key, amount) = key_and_amount(args, "withdraw")?;
        self.realm
            .update(&self.accounts, &key, |a| a.withdraw(amount))?;
        self.report_balance(&key)
    }

    /// Debits `from` first; only a successful debit is followed by the
    /// credit, and a failed credit is reversed.
    fn transfer(&mut self, args: &[&str]) -> Result<()> {
        let [from, to, amount] = args else {
            bail!("usage: transfer <from> <to> <amount>");
        };
        let from = RecordKey::parse(from)?;
        let to = RecordKey::parse(to)?;
        let amount = parse_decimal(amount).map_err(|e| anyhow!(e))?;
        if from == to {
            bail!("cannot transfer from an account to itself");
        }
        for key in [&from, &to] {
            if self.realm.get(&self.accounts, key)?.is_none() {
                bail!("account '{key}' not found");
            }
        }

        self.realm.update(&self.accounts, &from, |a| {
            a.withdraw(amount).map(|_| format!("transferred {amount} to {to}"))
        })?;
        let credited = self.realm.update(&self.accounts, &to, |a| {
            a.deposit(amount).map(|_| format!("received {amount} from {from}"))
        });
        if let Err(credit) = credited {
            let reversal = self.realm.update(&self.accounts, &from, |a| {
                a.deposit(amount).map(|_| format!("transfer of {amount} to {to} reversed"))
            });
            return Err(failed_transfer(credit, reversal));
        }

        print_success(&format!("Transferred {amount} from {from} to {to}"));
        Ok(())
    }

    fn interest(&mut self, args: &[&str]) -> Result<()> {
        let [key] = args else {
            bail!("usage: interest <key>");
        };
        let key = RecordKey::parse(key)?;
        self.realm.authorize(&bank::apply_interest())?;
        self.realm
            .update(&self.accounts, &key, Account::apply_interest)?;
        self.report_balance(&key)
    }

    fn show(&self, args: &[&str]) -> Result<()> {
        let [key] = args else {
            bail!("usage: show <key>");
        };
        let key = RecordKey::parse(key)?;
        let record = self
            .realm
            .get(&self.accounts, &key)?
            .ok_or_else(|| anyhow!("account '{key}' not found"))?;
        let account = record.attributes();
        print_info_table(&[
            ("Account", key.to_string()),
            ("Holder", account.holder.clone()),
            ("Kind", account.kind.to_string()),
            ("Balance", account.balance.to_string()),
            (
                "Officer",
                account
                    .officer
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ToString::to_string),
            ),
            ("Opened", format_time(record.created_at())),
            ("Changes", record.history().len().to_string()),
        ]);
        Ok(())
    }

    fn list(&self) -> Result<()> {
        let rows: Vec<Vec<String>> = self
            .realm
            .list(&self.accounts, |_| true)?
            .map(|record| {
                let account = record.attributes();
                vec![
                    record.key().to_string(),
                    account.holder.clone(),
                    account.kind.to_string(),
                    account.balance.to_string(),
                ]
            })
            .collect();
        print_rows(
            &["Account", "Holder", "Kind", "Balance"],
            &rows,
            "account",
            "No accounts.",
        );
        Ok(())
    }

    fn history(&self, args: &[&str]) -> Result<()> {
        let [key] = args else {
            bail!("usage: history <key>");
        };
        let key = RecordKey::parse(key)?;
        let rows: Vec<Vec<String>> = self
            .realm
            .history(&self.accounts, &key)?
            .iter()
            .map(|entry| {
                vec![
                    format_time(entry.at()),
                    entry.actor().to_string(),
                    entry.description().to_string(),
                ]
            })
            .collect();
        print_rows(&["Time", "Actor", "Change"], &rows, "change", "No history.");
        Ok(())
    }

    fn close(&mut self, args: &[&str]) -> Result<()> {
        let [key] = args else {
            bail!("usage: close <key>");
        };
        let key = RecordKey::parse(key)?;
        let closed = self
            .realm
            .delete(&self.accounts, &key, RemovalPolicy::Restrict)?;
        print_success(&format!(
            "Closed account {key} (final balance {})",
            closed.attributes().balance
        ));
        Ok(())
    }

    fn export(&self, args: &[&str]) -> Result<()> {
        self.realm.authorize(&Capability::ViewHistory)?;
        let records: Vec<&Record<Account>> = self.realm.list(&self.accounts, |_| true)?.collect();
        let json = serde_json::to_string_pretty(&records)?;
        match args {
            [] => println!("{json}"),
            [path] => {
                fs::write(path, json).with_context(|| format!("Failed to write {path}"))?;
                print_success(&format!("Exported {} account(s) to {path}", records.len()));
            }
            _ => bail!("usage: export [path]"),
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------------

    fn users(&self) -> Result<()> {
        let rows: Vec<Vec<String>> = self
            .realm
            .principals()?
            .map(|p| {
                vec![
                    p.id().to_string(),
                    p.display_name().to_string(),
                    p.role().to_string(),
                    status(p).to_string(),
                    p.unit().unwrap_or("-").to_string(),
                ]
            })
            .collect();
        print_rows(
            &["Id", "Name", "Role", "Status", "Unit"],
            &rows,
            "principal",
            "No principals.",
        );
        Ok(())
    }

    fn add_user(&mut self, args: &[&str]) -> Result<()> {
        let [id, role, secret, name @ ..] = args else {
            bail!("usage: adduser <id> <role> <secret> [name]");
        };
        let id = PrincipalId::parse(id)?;
        let role: Role = role.parse()?;
        let name = if name.is_empty() {
            id.to_string()
        } else {
            name.join(" ")
        };
        let secret = Zeroizing::new((*secret).to_string());
        self.realm.provision_principal(Principal::new(
            id.clone(),
            name,
            role.clone(),
            Credential::from_secret(&secret),
        ))?;
        print_success(&format!("Created {id} with role {role}"));
        Ok(())
    }

    fn set_role(&mut self, args: &[&str]) -> Result<()> {
        let [id, role] = args else {
            bail!("usage: role <id> <role>");
        };
        let id = PrincipalId::parse(id)?;
        let role: Role = role.parse()?;
        self.realm.set_principal_role(&id, role.clone())?;
        print_success(&format!("{id} is now {role}"));
        Ok(())
    }

    fn set_active(&mut self, args: &[&str], active: bool) -> Result<()> {
        let [id] = args else {
            bail!(
                "usage: {} <id>",
                if active { "activate" } else { "deactivate" }
            );
        };
        let id = PrincipalId::parse(id)?;
        self.realm.set_principal_active(&id, active)?;
        print_success(&format!(
            "{id} {}",
            if active { "activated" } else { "deactivated" }
        ));
        Ok(())
    }

    fn remove_user(&mut self, args: &[&str]) -> Result<()> {
        let (id, policy) = match args {
            [id] | [id, "restrict"] => (id, RemovalPolicy::Restrict),
            [id, "cascade"] => (id, RemovalPolicy::Cascade),
            _ => bail!("usage: rmuser <id> [restrict|cascade]"),
        };
        let id = PrincipalId::parse(id)?;
        let removed = self.realm.remove_principal(&id, policy)?;
        print_success(&format!("Removed {} ({id})", removed.display_name()));
        Ok(())
    }

    fn report_balance(&self, key: &RecordKey) -> Result<()> {
        if let Some(record) = self.realm.get(&self.accounts, key)? {
            let last = record
                .history()
                .last()
                .map_or("", |entry| entry.description());
            print_success(&format!(
                "{key}: {last} (balance {})",
                record.attributes().balance
            ));
        }
        Ok(())
    }
}

fn key_and_amount(args: &[&str], command: &str) -> Result<(RecordKey, rust_decimal::Decimal)> {
    let [key, amount] = args else {
        bail!("usage: {command} <key> <amount>");
    };
    let amount = parse_decimal(amount).map_err(|e| anyhow!(e))?;
    Ok((RecordKey::parse(key)?, amount))
}

fn principal_entries(p: &Principal) -> Vec<(&'static str, String)> {
    vec![
        ("Id", p.id().to_string()),
        ("Name", p.display_name().to_string()),
        ("Role", p.role().to_string()),
        ("Status", status(p).to_string()),
        ("Unit", p.unit().unwrap_or("-").to_string()),
    ]
}

fn status(p: &Principal) -> &'static str {
    if p.is_active() { "active" } else { "inactive" }
}

/// Error for a transfer whose credit failed. A failed reversal leaves the
/// debit in place, so both causes are reported.
fn failed_transfer(credit: RealmError, reversal: warden::Result<()>) -> anyhow::Error {
    match reversal {
        Ok(()) => credit.into(),
        Err(reversal) => {
            tracing::error!(%credit, %reversal, "transfer debit could not be reversed");
            anyhow!("{credit}; reversing the debit also failed: {reversal}")
        }
    }
}

/// Renders a history timestamp as UTC wall-clock time.
fn format_time(at: Timestamp) -> String {
    let secs = i64::try_from(at.as_secs()).unwrap_or(i64::MAX);
    let nanos = u32::try_from(at.as_nanos() % 1_000_000_000).unwrap_or(0);
    DateTime::<Utc>::from_timestamp(secs, nanos).map_or_else(
        || at.to_string(),
        |time| time.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
    )
}
