use alloy::primitives::{Address, B256};
use momentum::cache::ContestCache;
use momentum::cli::{self, Command, USAGE};
use momentum::client::{ClientError, MomentumClient, WriteKind, WriteTracker};
use momentum::config::Config;
use momentum::contracts::{abi, minimum_stake, TOKEN_SYMBOL};
use momentum::dashboard::{self, DashboardState};
use momentum::forms::{ContestField, ContestForm, StakeAction, StakeForm};
use momentum::network::NetworkCheck;
use momentum::session::Session;
use momentum::view::{
    admin_access, format_usdc, parse_usdc, unix_now, AdminAccess, ContestView,
};
use std::path::Path;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = match cli::parse(&args) {
        Ok(inv) => inv,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            std::process::exit(2);
        }
    };
    if invocation.command == Command::Help {
        println!("{USAGE}");
        return Ok(());
    }

    // Load config
    let config = match invocation.config.as_deref() {
        Some(path) => Config::load(path)?,
        None if Path::new("momentum.toml").exists() => Config::load(Path::new("momentum.toml"))?,
        None => Config::from_env()?,
    };

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    info!("momentum v{} starting", env!("CARGO_PKG_VERSION"));

    for (sig, ok) in abi::verify_topic_hashes() {
        if !ok {
            warn!(signature = %sig, "event topic hash mismatch, logs for it will be missed");
        }
    }

    let client = MomentumClient::connect(&config).await?;

    match invocation.command {
        Command::Serve => serve(config, client).await,
        command => run_once(&client, command).await,
    }
}

async fn serve(config: Config, client: MomentumClient) -> anyhow::Result<()> {
    match client.network_check().await {
        Ok(NetworkCheck::Correct) => info!(chain_id = client.network().chain_id, "on the expected network"),
        Ok(NetworkCheck::WrongNetwork { expected, actual }) => warn!(
            expected = expected,
            actual = actual,
            "RPC reports a different chain, writes will be refused"
        ),
        Err(e) => warn!(error = %e, "could not check chain id"),
    }

    let bind = config.dashboard.bind_addr.clone();
    let session = Session::start(config, client);
    let (_tasks, mut signal_rx) = session.spawn_background();

    let dash_state = DashboardState {
        session: session.clone(),
    };
    tokio::spawn(async move {
        if let Err(e) = dashboard::serve(dash_state, &bind).await {
            error!(error = %e, "dashboard server error");
        }
    });

    loop {
        tokio::select! {
            Some(signal) = signal_rx.recv() => {
                session.handle_signal(&signal).await;
            }

            _ = tokio::signal::ctrl_c() => {
                info!("shutting down...");
                break;
            }
        }
    }

    Ok(())
}

fn print_tx(client: &MomentumClient, kind: WriteKind, tx_hash: B256) {
    println!("{kind} confirmed: {}", client.network().tx_url(tx_hash));
}

fn require_signer(client: &MomentumClient) -> anyhow::Result<Address> {
    client
        .signer()
        .ok_or_else(|| anyhow::anyhow!(ClientError::NoSigner))
}

fn require_admin(client: &MomentumClient) -> anyhow::Result<()> {
    match admin_access(client.signer(), client.contracts().admin) {
        AdminAccess::Granted => Ok(()),
        AdminAccess::NotConnected => Err(ClientError::NoSigner.into()),
        AdminAccess::Denied => anyhow::bail!("the configured wallet is not the contest admin"),
    }
}

fn print_contest(view: &ContestView) {
    println!("{}  [{}]", view.question, view.status_label);
    println!("  address   {}", view.address);
    println!("  A  {:<30} ${:>14}  {:>3}%", view.option_a, view.total_a, view.a_pct);
    println!("  B  {:<30} ${:>14}  {:>3}%", view.option_b, view.total_b, view.b_pct);
    println!("  pool      ${}", view.total_pool);
    println!("  time left {}", view.time_left);
    if let Some(ends_at) = &view.ends_at {
        println!("  ends at   {ends_at}");
    }
    if let Some(winner) = &view.winner {
        println!("  winner    {winner}");
    }
}

async fn run_once(client: &MomentumClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Serve | Command::Help => {}

        Command::Contests => {
            let addresses = client.all_contests().await?;
            let cache = ContestCache::new();
            cache.refresh_many(client, &addresses).await;
            let views = cache.views(unix_now());
            if views.is_empty() {
                println!("no contests yet");
            }
            for v in views {
                println!(
                    "{:<9} {:<44} {:>12}  {:>3}/{:<3}  {}  {}",
                    v.status_label, v.question_short, v.total_pool, v.a_pct, v.b_pct, v.time_left, v.address
                );
            }
        }

        Command::Contest(address) => {
            if !client.is_valid_contest(address).await? {
                anyhow::bail!("{address} is not a contest deployed by the factory");
            }
            let snapshot = client.contest_snapshot(address).await?;
            print_contest(&ContestView::derive(&snapshot, unix_now()));
            if let Some(user) = client.signer() {
                let position = client.user_position(address, user, snapshot.is_resolved).await?;
                println!(
                    "  your stake A ${} / B ${} (total ${})",
                    format_usdc(position.stakes.on_a),
                    format_usdc(position.stakes.on_b),
                    format_usdc(position.stakes.total)
                );
                if position.can_claim() {
                    println!("  claimable ${}", format_usdc(position.winnings));
                } else if position.has_claimed {
                    println!("  winnings claimed");
                }
            }
        }

        Command::Stats => {
            let (stats, fees, owner, duration) = futures::try_join!(
                client.factory_stats(),
                client.platform_fee_balance(),
                client.factory_owner(),
                client.contest_duration(),
            )?;
            println!("contests        {}", stats.total_contests);
            println!("active          {}", stats.active_contests);
            println!("resolved        {}", stats.resolved_contests);
            println!("fees collected  ${}", format_usdc(stats.total_fees_collected));
            println!("withdrawable    ${}", format_usdc(fees));
            println!("owner           {owner}");
            println!("duration        {duration}s");
        }

        Command::Balance => {
            let owner = require_signer(client)?;
            let (balance, meta) =
                futures::try_join!(client.token_balance(owner), client.token_metadata())?;
            println!("{owner}: {} {}", format_usdc(balance), meta.symbol);
        }

        Command::Network => {
            let identity = client.network();
            match client.network_check().await? {
                NetworkCheck::Correct => println!("connected to {} ({})", identity.name, identity.chain_id),
                NetworkCheck::WrongNetwork { expected, actual } => {
                    println!("wrong network: RPC reports chain {actual}, expected {expected}");
                }
            }
            println!("{}", serde_json::to_string_pretty(&identity.add_chain_request())?);
            println!(
                "{}",
                serde_json::to_string_pretty(&identity.watch_token_request(client.contracts().token))?
            );
        }

        Command::Faucet => {
            let tracker = WriteTracker::new(WriteKind::Faucet);
            let tx = client.faucet(&tracker).await?;
            print_tx(client, WriteKind::Faucet, tx);
        }

        Command::Approve { contest, amount } => {
            let units = parse_usdc(&amount)?;
            let tracker = WriteTracker::new(WriteKind::Approve);
            let tx = client.approve(&tracker, contest, units).await?;
            print_tx(client, WriteKind::Approve, tx);
        }

        Command::Stake { contest, side, amount } => {
            let owner = require_signer(client)?;
            let mut form = StakeForm::new(minimum_stake());
            form.select(side);

            let (balance, allowance) = futures::try_join!(
                client.token_balance(owner),
                client.token_allowance(owner, contest),
            )?;
            form.set_amount_or_max(&amount, balance);
            let snapshot = client.contest_snapshot(contest).await?;
            if let Some(roi) = form.roi_preview(snapshot.total_a, snapshot.total_b) {
                println!("projected ROI {roi}% if {} wins", snapshot.option_text(side));
            }

            if let StakeAction::Approve { amount } = form.next_action(balance, allowance)? {
                println!("allowance ${} is short, approving ${} first", format_usdc(allowance), format_usdc(amount));
                let tracker = WriteTracker::new(WriteKind::Approve);
                let tx = client.approve(&tracker, contest, amount).await?;
                print_tx(client, WriteKind::Approve, tx);
            }
            let amount = form.validate(balance)?;
            let tracker = WriteTracker::new(WriteKind::Stake);
            let tx = client.stake(&tracker, contest, side, amount).await?;
            print_tx(client, WriteKind::Stake, tx);
            if form.observe(&tracker.status()) {
                println!("staked {} {TOKEN_SYMBOL} on {side}", format_usdc(amount));
            }
        }

        Command::Claim(contest) => {
            let owner = require_signer(client)?;
            let snapshot = client.contest_snapshot(contest).await?;
            let position = client.user_position(contest, owner, snapshot.is_resolved).await?;
            if !position.can_claim() {
                anyhow::bail!("nothing to claim on {contest}");
            }
            let tracker = WriteTracker::new(WriteKind::Claim);
            let tx = client.claim(&tracker, contest).await?;
            print_tx(client, WriteKind::Claim, tx);
            println!("claimed {} {TOKEN_SYMBOL}", format_usdc(position.winnings));
        }

        Command::Resolve(contest) => {
            let tracker = WriteTracker::new(WriteKind::Resolve);
            let tx = client.resolve(&tracker, contest).await?;
            print_tx(client, WriteKind::Resolve, tx);
        }

        Command::Create { question, option_a, option_b } => {
            require_admin(client)?;
            let mut form = ContestForm::new();
            form.set(ContestField::Question, question);
            form.set(ContestField::OptionA, option_a);
            form.set(ContestField::OptionB, option_b);
            let Some(valid) = form.submit() else {
                let errors = form.errors();
                for msg in [&errors.question, &errors.option_a, &errors.option_b]
                    .into_iter()
                    .flatten()
                {
                    eprintln!("  {msg}");
                }
                anyhow::bail!("contest form is invalid");
            };
            let tracker = WriteTracker::new(WriteKind::CreateContest);
            let tx = client
                .create_contest(&tracker, &valid.question, &valid.option_a, &valid.option_b)
                .await?;
            print_tx(client, WriteKind::CreateContest, tx);
            if form.observe(&tracker.status()) {
                println!("created \"{}\"", valid.question);
            }
        }

        Command::WithdrawFees => {
            require_admin(client)?;
            let tracker = WriteTracker::new(WriteKind::WithdrawFees);
            let tx = client.withdraw_platform_fees(&tracker).await?;
            print_tx(client, WriteKind::WithdrawFees, tx);
        }
    }

    Ok(())
}
