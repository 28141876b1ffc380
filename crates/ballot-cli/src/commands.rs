use anyhow::{anyhow, bail, Context};
use ballot_ledger::{
    Action, BallotReader, BallotWriter, InMemoryBallot, LedgerError, ParticipantState, Receipt,
    ReplayEngine, TallyValidator,
};
use ballot_server::{BallotServer, ServerConfig};
use ballot_store::{FileStateStore, StateStore};
use ballot_types::{ParticipantId, ProposalLabel};
use colored::Colorize;
use serde_json::json;

use crate::cli::*;

/// Per-invocation context shared by every command.
struct Session {
    store: FileStateStore,
    format: OutputFormat,
    caller: Option<String>,
}

impl Session {
    fn caller(&self) -> anyhow::Result<ParticipantId> {
        let raw = self
            .caller
            .as_deref()
            .context("no caller identity; pass --as or set BALLOT_CALLER")?;
        Ok(ParticipantId::resolve(raw)?)
    }

    fn open(&self) -> anyhow::Result<InMemoryBallot> {
        self.store.open_ballot()?.with_context(|| {
            format!(
                "no ballot at {}; run `ballot deploy` first",
                self.store.path().display()
            )
        })
    }

    /// Run one mutating call as the caller and persist the result.
    fn submit<F>(&self, call: F) -> anyhow::Result<()>
    where
        F: FnOnce(&InMemoryBallot, &ParticipantId) -> Result<Receipt, LedgerError>,
    {
        let ballot = self.open()?;
        let caller = self.caller()?;
        let head = ballot.head()?;
        let receipt = call(&ballot, &caller)?;
        self.store
            .save_if_head(&ballot.snapshot()?, head)
            .context("call not recorded; retry against the current state")?;
        self.print_receipt(&receipt)
    }

    fn print_json(&self, value: serde_json::Value) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(&value)?);
        Ok(())
    }

    fn print_receipt(&self, receipt: &Receipt) -> anyhow::Result<()> {
        if self.format == OutputFormat::Json {
            return self.print_json(json!({
                "seq": receipt.seq,
                "action": receipt.action.name(),
                "caller": receipt.caller,
                "tx_hash": receipt.hash_hex(),
                "details": receipt.action,
            }));
        }

        println!("{} Action: {}", "✓".green().bold(), receipt.action.name().bold());
        match &receipt.action {
            Action::Deploy { proposals } => {
                println!("  Administrator: {}", receipt.caller.to_string().cyan());
                for (i, label) in proposals.iter().enumerate() {
                    println!("  Proposal {}: {}", i + 1, label);
                }
            }
            Action::GrantRight { target } => {
                println!("  Administrator: {}", receipt.caller.to_string().cyan());
                println!("  Voter: {}", target.to_string().cyan());
            }
            Action::Vote { proposal, weight } => {
                println!("  Voter: {}", receipt.caller.to_string().cyan());
                println!("  Vote: Proposal {}", proposal + 1);
                println!("  Weight: {weight}");
            }
            Action::Delegate {
                to,
                resolved,
                weight,
                applied_to,
            } => {
                println!("  Voter: {}", receipt.caller.to_string().cyan());
                println!("  Delegate: {}", to.to_string().cyan());
                if resolved != to {
                    println!("  Resolved to: {}", resolved.to_string().cyan());
                }
                println!("  Weight: {weight}");
                if let Some(proposal) = applied_to {
                    println!("  Counted for: Proposal {}", proposal + 1);
                }
            }
        }
        println!("  Tx hash: {}", receipt.hash_hex().yellow());
        println!("  Seq: {}", receipt.seq);
        Ok(())
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        command,
        format,
        state,
        caller,
        ..
    } = cli;
    let session = Session {
        store: FileStateStore::new(state),
        format,
        caller,
    };

    match command {
        Command::Deploy(args) => cmd_deploy(&session, args),
        Command::GiveRight(args) => cmd_give_right(&session, args),
        Command::Vote(args) => cmd_vote(&session, args),
        Command::Delegate(args) => cmd_delegate(&session, args),
        Command::Winner => cmd_winner(&session),
        Command::Proposals => cmd_proposals(&session),
        Command::Voter(args) => cmd_voter(&session, args),
        Command::History(args) => cmd_history(&session, args),
        Command::Verify => cmd_verify(&session),
        Command::Whoami(args) => cmd_whoami(&session, args),
        Command::Serve(args) => cmd_serve(&session, args),
    }
}

fn cmd_deploy(session: &Session, args: DeployArgs) -> anyhow::Result<()> {
    let administrator = session.caller()?;
    let labels = args
        .labels
        .into_iter()
        .map(ProposalLabel::new)
        .collect::<Result<Vec<_>, _>>()?;

    let ballot = InMemoryBallot::deploy(administrator, labels)?;
    if args.force {
        session.store.save_ballot(&ballot)?;
    } else {
        session.store.create(&ballot)?;
    }

    let receipts = ballot.receipts()?;
    let genesis = receipts.first().context("deployed ballot has no journal")?;
    session.print_receipt(genesis)
}

fn cmd_give_right(session: &Session, args: TargetArgs) -> anyhow::Result<()> {
    let target = ParticipantId::resolve(&args.target)?;
    session.submit(|ballot, caller| ballot.grant_right(caller, &target))
}

fn cmd_vote(session: &Session, args: VoteArgs) -> anyhow::Result<()> {
    let index = args
        .proposal
        .checked_sub(1)
        .ok_or_else(|| anyhow!("proposal numbers start at 1"))?;
    session.submit(|ballot, caller| ballot.vote(caller, index))
}

fn cmd_delegate(session: &Session, args: TargetArgs) -> anyhow::Result<()> {
    let to = ParticipantId::resolve(&args.target)?;
    session.submit(|ballot, caller| ballot.delegate(caller, &to))
}

fn cmd_winner(session: &Session) -> anyhow::Result<()> {
    let ballot = session.open()?;
    let index = ballot.leading_proposal()?;
    let label = ballot.leading_proposal_label()?;
    let vote_count = ballot
        .proposals()?
        .get(index)
        .map(|p| p.vote_count)
        .unwrap_or_default();

    if session.format == OutputFormat::Json {
        return session.print_json(json!({
            "index": index,
            "number": index + 1,
            "label": label,
            "vote_count": vote_count,
        }));
    }
    println!(
        "Winner: Proposal {} ({}) with {} votes",
        (index + 1).to_string().bold(),
        label.to_string().green(),
        vote_count
    );
    Ok(())
}

fn cmd_proposals(session: &Session) -> anyhow::Result<()> {
    let ballot = session.open()?;
    let proposals = ballot.proposals()?;
    let leader = ballot.leading_proposal()?;

    if session.format == OutputFormat::Json {
        let list: Vec<_> = proposals
            .iter()
            .enumerate()
            .map(|(index, p)| json!({ "index": index, "label": p.label, "vote_count": p.vote_count }))
            .collect();
        return session.print_json(json!(list));
    }
    for (index, p) in proposals.iter().enumerate() {
        let marker = if index == leader { "*".green().bold() } else { " ".normal() };
        println!("{marker} {:>3}. {:<32} {}", index + 1, p.label.as_str(), p.vote_count);
    }
    Ok(())
}

fn cmd_voter(session: &Session, args: VoterArgs) -> anyhow::Result<()> {
    let id = ParticipantId::resolve(&args.identity)?;
    let record = session.open()?.participant(&id)?;

    if session.format == OutputFormat::Json {
        return session.print_json(json!({ "id": id, "weight": record.weight, "state": record.state }));
    }
    println!("Voter: {}", id.to_string().cyan());
    println!("  Weight: {}", record.weight);
    match record.state {
        ParticipantState::Idle if record.is_eligible() => println!("  Status: {}", "has not voted".yellow()),
        ParticipantState::Idle => println!("  Status: {}", "no right to vote".dimmed()),
        ParticipantState::Voted { proposal } => {
            println!("  Status: {} for Proposal {}", "voted".green(), proposal + 1)
        }
        ParticipantState::Delegated { to } => {
            println!("  Status: {} to {}", "delegated".green(), to.to_string().cyan())
        }
    }
    Ok(())
}

fn cmd_history(session: &Session, args: HistoryArgs) -> anyhow::Result<()> {
    let receipts = session.open()?.receipts()?;
    let skip = args
        .limit
        .map_or(0, |limit| receipts.len().saturating_sub(limit));
    let shown = &receipts[skip..];

    if session.format == OutputFormat::Json {
        let list: Vec<_> = shown
            .iter()
            .map(|r| {
                json!({
                    "seq": r.seq,
                    "action": r.action.name(),
                    "caller": r.caller,
                    "tx_hash": r.hash_hex(),
                    "details": r.action,
                })
            })
            .collect();
        return session.print_json(json!(list));
    }
    for receipt in shown {
        println!(
            "{}  {}",
            receipt.to_string().yellow(),
            receipt.caller.short_id().dimmed()
        );
    }
    Ok(())
}

fn cmd_verify(session: &Session) -> anyhow::Result<()> {
    let snapshot = session.store.load()?.with_context(|| {
        format!("no ballot at {}", session.store.path().display())
    })?;
    let replayed = ReplayEngine::replay(&snapshot.receipts)?;
    let converges = replayed.ledger == snapshot.ledger;
    let report = TallyValidator::validate(&snapshot.ledger);

    if session.format == OutputFormat::Json {
        let violations: Vec<_> = report.violations.iter().map(|v| v.description.clone()).collect();
        session.print_json(json!({
            "receipts": replayed.applied,
            "head": format!("0x{}", hex::encode(replayed.head)),
            "converges": converges,
            "issued_weight": report.issued_weight,
            "tallied_weight": report.tallied_weight,
            "pending_weight": report.pending_weight,
            "violations": violations,
        }))?;
    } else {
        println!(
            "Journal: {} receipts, head {}",
            replayed.applied,
            hex::encode(&replayed.head[..8]).yellow()
        );
        println!("  Hash chain: {}", "valid".green());
        if converges {
            println!("  Replay: {}", "converges".green());
        } else {
            println!("  Replay: {}", "diverges from stored ledger".red());
        }
        println!(
            "  Weight: issued {} = tallied {} + pending {}",
            report.issued_weight, report.tallied_weight, report.pending_weight
        );
        for violation in &report.violations {
            println!("  {} {}", "✗".red().bold(), violation.description);
        }
    }

    if !converges || !report.is_valid() {
        bail!("ballot state failed verification");
    }
    Ok(())
}

fn cmd_whoami(session: &Session, args: WhoamiArgs) -> anyhow::Result<()> {
    let id = if args.new {
        ParticipantId::ephemeral()
    } else {
        session.caller()?
    };
    if session.format == OutputFormat::Json {
        return session.print_json(json!({ "address": id }));
    }
    println!("{id}");
    Ok(())
}

fn cmd_serve(session: &Session, args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_toml_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if config.state_path.is_none() {
        config.state_path = Some(session.store.path().to_path_buf());
    }
    if config.administrator.is_none() {
        config.administrator = session.caller.clone();
    }

    let server = BallotServer::from_config(config)?;
    println!(
        "Ballot server on {} (state: {})",
        server.config().bind_addr.to_string().bold(),
        session.store.path().display()
    );
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}
