//! Axum-based operator dashboard for the Momentum client.
//!
//! Provides:
//!   GET  /                             → HTML contest list (auto-refresh 5s)
//!   GET  /contest/:address             → HTML contest detail + own position
//!   GET  /admin                        → HTML admin panel (admin wallet only)
//!   GET  /api/contests                 → JSON contest views
//!   GET  /api/contests/:address        → JSON contest view + own position
//!   POST /api/contests/:address/preview → JSON stake validation + ROI preview
//!   GET  /api/stats                    → JSON factory stats
//!   GET  /api/account                  → JSON wallet, balance, admin gate
//!   GET  /api/writes                   → JSON write statuses
//!   GET  /api/network                  → JSON chain identity + wallet requests
//!   POST /api/faucet | /api/approve | /api/stake | /api/claim | /api/resolve
//!   POST /api/admin/contests | /api/admin/withdraw-fees

use crate::client::{ClientError, ReadState, Side, UserPosition, WriteError, WriteKind, WriteStatusView};
use crate::contracts::{minimum_stake, parse_address};
use crate::forms::{ContestField, ContestForm, QuickAmount, StakeAction, StakeForm};
use crate::network::{NetworkCheck, UNRECOGNIZED_CHAIN_ERROR};
use crate::session::Session;
use crate::view::{
    format_large_number, format_usdc, parse_usdc, unix_now, AdminAccess, ContestFormErrors,
    ContestStatus, ContestView,
};
use alloy::primitives::{Address, U256};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Shared state for the dashboard routes.
#[derive(Clone)]
pub struct DashboardState {
    pub session: Arc<Session>,
}

/// Build the Axum router.
pub fn build_router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(index_html))
        .route("/contest/:address", get(contest_html))
        .route("/admin", get(admin_html))
        .route("/api/contests", get(api_contests))
        .route("/api/contests/:address", get(api_contest))
        .route("/api/contests/:address/preview", post(api_stake_preview))
        .route("/api/stats", get(api_stats))
        .route("/api/account", get(api_account))
        .route("/api/writes", get(api_writes))
        .route("/api/network", get(api_network))
        .route("/api/faucet", post(api_faucet))
        .route("/api/approve", post(api_approve))
        .route("/api/stake", post(api_stake))
        .route("/api/claim", post(api_claim))
        .route("/api/resolve", post(api_resolve))
        .route("/api/admin/contests", post(api_admin_create))
        .route("/api/admin/withdraw-fees", post(api_admin_withdraw))
        .with_state(state)
}

/// Start the dashboard server.
pub async fn serve(state: DashboardState, bind_addr: &str) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = bind_addr, "dashboard listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// --- JSON shapes ---

#[derive(Debug, Clone, Serialize)]
pub struct StatsView {
    pub total_contests: String,
    pub active_contests: String,
    pub resolved_contests: String,
    pub total_fees_collected: String,
    pub platform_fee_balance: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionView {
    pub stake_a: String,
    pub stake_b: String,
    pub total: String,
    pub has_claimed: bool,
    pub is_winner: bool,
    pub winnings: String,
    pub can_claim: bool,
}

impl From<&UserPosition> for PositionView {
    fn from(p: &UserPosition) -> Self {
        Self {
            stake_a: format_usdc(p.stakes.on_a),
            stake_b: format_usdc(p.stakes.on_b),
            total: format_usdc(p.stakes.total),
            has_claimed: p.has_claimed,
            is_winner: p.is_winner,
            winnings: format_usdc(p.winnings),
            can_claim: p.can_claim(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct NetworkStatus {
    chain_id: u64,
    name: String,
    correct: Option<bool>,
    connected_chain_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
struct AccountView {
    address: Option<String>,
    balance: Option<String>,
    admin: AdminAccess,
    quick_amounts: Vec<QuickAmount>,
    network: NetworkStatus,
}

#[derive(Debug, Deserialize)]
pub struct ContestRequest {
    pub contest: String,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub contest: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct StakeRequest {
    pub contest: String,
    pub side: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub side: Option<String>,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateContestRequest {
    pub question: String,
    pub option_a: String,
    pub option_b: String,
}

// --- helpers ---

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

fn parse_contest(raw: &str) -> Result<Address, Response> {
    parse_address("contest", raw).map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))
}

fn require_account(session: &Session) -> Result<Address, Response> {
    session
        .account()
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "no wallet connected"))
}

fn write_accepted(session: &Session, kind: WriteKind) -> Response {
    let view = session.writes.get(kind).status().to_view(kind);
    (StatusCode::ACCEPTED, Json(view)).into_response()
}

fn write_refused(e: ClientError) -> Response {
    let status = match &e {
        ClientError::Write(WriteError::InFlight(_)) => StatusCode::CONFLICT,
        ClientError::NoSigner | ClientError::WrongNetwork { .. } => StatusCode::PRECONDITION_FAILED,
        _ => StatusCode::BAD_GATEWAY,
    };
    error(status, e.to_string())
}

fn network_status(session: &Session) -> NetworkStatus {
    let identity = session.client.network();
    let (correct, connected_chain_id) = match session.network.state() {
        ReadState::Ready(NetworkCheck::Correct) => (Some(true), Some(identity.chain_id)),
        ReadState::Ready(NetworkCheck::WrongNetwork { actual, .. }) => (Some(false), Some(actual)),
        _ => (None, None),
    };
    NetworkStatus {
        chain_id: identity.chain_id,
        name: identity.name.clone(),
        correct,
        connected_chain_id,
    }
}

fn stats_view(session: &Session) -> Option<StatsView> {
    let stats = session.stats.state().ready().copied()?;
    Some(StatsView {
        total_contests: stats.total_contests.to_string(),
        active_contests: stats.active_contests.to_string(),
        resolved_contests: stats.resolved_contests.to_string(),
        total_fees_collected: format_usdc(stats.total_fees_collected),
        platform_fee_balance: session.fee_balance.state().ready().map(|b| format_usdc(*b)),
    })
}

/// Balance from the polled read, falling back to a direct fetch.
async fn current_balance(session: &Session, owner: Address) -> Result<U256, Response> {
    if let ReadState::Ready(balance) = session.balance.state() {
        return Ok(balance);
    }
    session
        .client
        .token_balance(owner)
        .await
        .map_err(|e| error(StatusCode::BAD_GATEWAY, e.to_string()))
}

/// Cached snapshot, or a fresh fetch for a contest the factory knows about.
async fn load_contest(session: &Session, contest: Address) -> Result<ContestView, Response> {
    if let Some(snapshot) = session.cache.get(&contest) {
        return Ok(ContestView::derive(&snapshot, unix_now()));
    }
    let valid = session
        .client
        .is_valid_contest(contest)
        .await
        .map_err(|e| error(StatusCode::BAD_GATEWAY, e.to_string()))?;
    if !valid {
        return Err(error(StatusCode::NOT_FOUND, "unknown contest"));
    }
    let snapshot = session
        .cache
        .refresh(&session.client, contest)
        .await
        .map_err(|e| error(StatusCode::BAD_GATEWAY, e.to_string()))?;
    Ok(ContestView::derive(&snapshot, unix_now()))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn read_text<T>(state: &ReadState<T>, render: impl Fn(&T) -> String) -> String {
    match state {
        ReadState::Disabled => "-".to_string(),
        ReadState::Loading => "loading...".to_string(),
        ReadState::Ready(v) => render(v),
        ReadState::Failed(_) => "unavailable".to_string(),
    }
}

// --- API Handlers ---

async fn api_contests(State(state): State<DashboardState>) -> impl IntoResponse {
    Json(state.session.cache.views(unix_now()))
}

async fn api_contest(
    State(state): State<DashboardState>,
    Path(address): Path<String>,
) -> Response {
    let session = &state.session;
    let contest = match parse_contest(&address) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let view = match load_contest(session, contest).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let position = session.position(contest).ready().map(PositionView::from);
    let allowance = session.allowance(contest).ready().map(|a| format_usdc(*a));
    Json(serde_json::json!({
        "contest": view,
        "position": position,
        "allowance": allowance,
    }))
    .into_response()
}

async fn api_stake_preview(
    State(state): State<DashboardState>,
    Path(address): Path<String>,
    Json(req): Json<PreviewRequest>,
) -> Response {
    let session = &state.session;
    let contest = match parse_contest(&address) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let Some(snapshot) = session.cache.get(&contest) else {
        return error(StatusCode::NOT_FOUND, "contest not loaded yet");
    };

    let mut form = StakeForm::new(minimum_stake());
    if let Some(side) = req.side.as_deref() {
        match side.parse::<Side>() {
            Ok(side) => form.select(side),
            Err(e) => return error(StatusCode::BAD_REQUEST, e),
        }
    }
    form.set_amount(req.amount);

    let balance = session.balance.state().ready().copied().unwrap_or(U256::ZERO);
    let allowance = session.allowance(contest).ready().copied().unwrap_or(U256::ZERO);
    let validation = form.validate(balance).err().map(|e| e.to_string());

    Json(serde_json::json!({
        "error": validation,
        "needs_approval": form.needs_approval(allowance),
        "roi_pct": form.roi_preview(snapshot.total_a, snapshot.total_b),
    }))
    .into_response()
}

async fn api_stats(State(state): State<DashboardState>) -> Response {
    match stats_view(&state.session) {
        Some(view) => Json(view).into_response(),
        None => error(StatusCode::SERVICE_UNAVAILABLE, "stats not loaded yet"),
    }
}

async fn api_account(State(state): State<DashboardState>) -> impl IntoResponse {
    let session = &state.session;
    let balance = session.balance.state().ready().copied();
    Json(AccountView {
        address: session.account().map(|a| a.to_checksum(None)),
        balance: balance.map(format_usdc),
        admin: session.admin_access(),
        quick_amounts: StakeForm::quick_amounts(balance.unwrap_or(U256::ZERO)),
        network: network_status(session),
    })
}

async fn api_writes(State(state): State<DashboardState>) -> impl IntoResponse {
    let views: Vec<WriteStatusView> = state.session.writes.views();
    Json(views)
}

async fn api_network(State(state): State<DashboardState>) -> impl IntoResponse {
    let session = &state.session;
    let identity = session.client.network();
    Json(serde_json::json!({
        "status": network_status(session),
        "chain_id_hex": identity.chain_id_hex(),
        "explorer_url": identity.explorer_url,
        "switch_request": identity.switch_request(),
        "add_chain_request": identity.add_chain_request(),
        "watch_token_request": identity.watch_token_request(session.client.contracts().token),
        "walletconnect_project_id": session.config().wallet.walletconnect_project_id,
        "add_chain_on_error": UNRECOGNIZED_CHAIN_ERROR,
    }))
}

async fn api_faucet(State(state): State<DashboardState>) -> Response {
    let session = &state.session;
    if let Err(resp) = require_account(session) {
        return resp;
    }
    match session.spawn_write(WriteKind::Faucet, None, |s| async move {
        s.client.faucet(s.writes.get(WriteKind::Faucet)).await
    })
    .await
    {
        Ok(()) => write_accepted(session, WriteKind::Faucet),
        Err(e) => write_refused(e),
    }
}

async fn api_approve(
    State(state): State<DashboardState>,
    Json(req): Json<ApproveRequest>,
) -> Response {
    let session = &state.session;
    if let Err(resp) = require_account(session) {
        return resp;
    }
    let contest = match parse_contest(&req.contest) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let amount = match parse_usdc(&req.amount) {
        Ok(a) if !a.is_zero() => a,
        _ => return error(StatusCode::UNPROCESSABLE_ENTITY, "Please enter a valid amount"),
    };
    match session.spawn_write(WriteKind::Approve, Some(contest), move |s| async move {
        s.client
            .approve(s.writes.get(WriteKind::Approve), contest, amount)
            .await
    })
    .await
    {
        Ok(()) => write_accepted(session, WriteKind::Approve),
        Err(e) => write_refused(e),
    }
}

async fn api_stake(State(state): State<DashboardState>, Json(req): Json<StakeRequest>) -> Response {
    let session = &state.session;
    let owner = match require_account(session) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let contest = match parse_contest(&req.contest) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    if let Some(snapshot) = session.cache.get(&contest) {
        if crate::view::contest_status(snapshot.is_resolved, snapshot.end_time, unix_now())
            != ContestStatus::Active
        {
            return error(StatusCode::CONFLICT, "contest is no longer accepting stakes");
        }
    }

    let mut form = StakeForm::new(minimum_stake());
    match req.side.parse::<Side>() {
        Ok(side) => form.select(side),
        Err(e) => return error(StatusCode::BAD_REQUEST, e),
    }
    let balance = match current_balance(session, owner).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    form.set_amount_or_max(&req.amount, balance);
    // allowance is read fresh; a stale poll would send a doomed stake
    let allowance = match session.client.token_allowance(owner, contest).await {
        Ok(a) => a,
        Err(e) => return error(StatusCode::BAD_GATEWAY, e.to_string()),
    };

    match form.next_action(balance, allowance) {
        Err(e) => error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        Ok(StakeAction::Approve { amount }) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": "approval required",
                "approve_amount": format_usdc(amount),
                "allowance": format_usdc(allowance),
            })),
        )
            .into_response(),
        Ok(StakeAction::Stake { side, amount }) => {
            match session.spawn_write(WriteKind::Stake, Some(contest), move |s| async move {
                s.client
                    .stake(s.writes.get(WriteKind::Stake), contest, side, amount)
                    .await
            })
            .await
            {
                Ok(()) => write_accepted(session, WriteKind::Stake),
                Err(e) => write_refused(e),
            }
        }
    }
}

async fn api_claim(State(state): State<DashboardState>, Json(req): Json<ContestRequest>) -> Response {
    let session = &state.session;
    if let Err(resp) = require_account(session) {
        return resp;
    }
    let contest = match parse_contest(&req.contest) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    if let Err(resp) = load_contest(session, contest).await {
        return resp;
    }
    if let ReadState::Ready(position) = session.position(contest) {
        if !position.can_claim() {
            return error(StatusCode::CONFLICT, "nothing to claim");
        }
    }
    match session.spawn_write(WriteKind::Claim, Some(contest), move |s| async move {
        s.client.claim(s.writes.get(WriteKind::Claim), contest).await
    })
    .await
    {
        Ok(()) => write_accepted(session, WriteKind::Claim),
        Err(e) => write_refused(e),
    }
}

async fn api_resolve(
    State(state): State<DashboardState>,
    Json(req): Json<ContestRequest>,
) -> Response {
    let session = &state.session;
    if let Err(resp) = require_account(session) {
        return resp;
    }
    let contest = match parse_contest(&req.contest) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match session.spawn_write(WriteKind::Resolve, Some(contest), move |s| async move {
        s.client.resolve(s.writes.get(WriteKind::Resolve), contest).await
    })
    .await
    {
        Ok(()) => write_accepted(session, WriteKind::Resolve),
        Err(e) => write_refused(e),
    }
}

/// Admin routes answer 404 to everyone else, so they are indistinguishable
/// from a missing page.
fn require_admin(session: &Session) -> Result<(), Response> {
    match session.admin_access() {
        AdminAccess::Granted => Ok(()),
        _ => Err(StatusCode::NOT_FOUND.into_response()),
    }
}

async fn api_admin_create(
    State(state): State<DashboardState>,
    Json(req): Json<CreateContestRequest>,
) -> Response {
    let session = &state.session;
    if let Err(resp) = require_admin(session) {
        return resp;
    }
    let mut form = ContestForm::new();
    form.set(ContestField::Question, req.question);
    form.set(ContestField::OptionA, req.option_a);
    form.set(ContestField::OptionB, req.option_b);
    let Some(valid) = form.submit() else {
        let errors: ContestFormErrors = form.errors().clone();
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response();
    };

    match session.spawn_write(WriteKind::CreateContest, None, move |s| async move {
        s.client
            .create_contest(
                s.writes.get(WriteKind::CreateContest),
                &valid.question,
                &valid.option_a,
                &valid.option_b,
            )
            .await
    })
    .await
    {
        Ok(()) => write_accepted(session, WriteKind::CreateContest),
        Err(e) => write_refused(e),
    }
}

async fn api_admin_withdraw(State(state): State<DashboardState>) -> Response {
    let session = &state.session;
    if let Err(resp) = require_admin(session) {
        return resp;
    }
    match session.spawn_write(WriteKind::WithdrawFees, None, |s| async move {
        s.client
            .withdraw_platform_fees(s.writes.get(WriteKind::WithdrawFees))
            .await
    })
    .await
    {
        Ok(()) => write_accepted(session, WriteKind::WithdrawFees),
        Err(e) => write_refused(e),
    }
}

// --- HTML ---

const STYLE: &str = r#"<style>
  * { margin: 0; padding: 0; box-sizing: border-box; }
  body { font-family: 'SF Mono', 'Fira Code', monospace; background: #0d1117; color: #c9d1d9; padding: 20px; }
  a { color: #58a6ff; text-decoration: none; }
  h1 { color: #58a6ff; margin-bottom: 20px; font-size: 1.4em; }
  h2 { color: #8b949e; margin: 20px 0 10px 0; font-size: 1.1em; border-bottom: 1px solid #21262d; padding-bottom: 5px; }
  .cards { display: flex; gap: 15px; margin-bottom: 20px; flex-wrap: wrap; }
  .card { background: #161b22; border: 1px solid #30363d; border-radius: 8px; padding: 15px 20px; min-width: 160px; }
  .card .label { color: #8b949e; font-size: 0.75em; text-transform: uppercase; letter-spacing: 1px; }
  .card .value { font-size: 1.5em; font-weight: bold; margin-top: 4px; }
  table { width: 100%; border-collapse: collapse; background: #161b22; border: 1px solid #30363d; border-radius: 8px; overflow: hidden; margin-bottom: 15px; }
  th { background: #21262d; color: #8b949e; text-align: left; padding: 8px 12px; font-size: 0.8em; text-transform: uppercase; letter-spacing: 0.5px; }
  td { padding: 8px 12px; border-top: 1px solid #21262d; font-size: 0.85em; }
  tr:hover { background: #1c2128; }
  .banner { background: #5a1e1e; border: 1px solid #e74c3c; border-radius: 6px; padding: 10px 14px; margin-bottom: 15px; }
  .auto { color: #484f58; font-size: 0.7em; margin-top: 15px; }
  .badge { display: inline-block; padding: 2px 6px; border-radius: 3px; font-size: 0.7em; font-weight: bold; }
  .badge-active { background: #238636; color: #fff; }
  .badge-ended { background: #9e6a03; color: #fff; }
  .badge-resolved { background: #30363d; color: #8b949e; }
</style>"#;

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="5">
<title>{title}</title>
{STYLE}
</head>
<body>
{body}
</body>
</html>"#
    ))
}

fn status_badge(view: &ContestView) -> String {
    format!(
        "<span class=\"badge badge-{}\">{}</span>",
        view.status, view.status_label
    )
}

fn network_banner(session: &Session) -> String {
    let status = network_status(session);
    match status.correct {
        Some(false) => format!(
            "<div class=\"banner\">Wrong network: connected to chain {}, switch to {} ({}). \
             See /api/network for the wallet request.</div>",
            status.connected_chain_id.unwrap_or_default(),
            escape_html(&status.name),
            status.chain_id,
        ),
        _ => String::new(),
    }
}

fn writes_rows(session: &Session) -> String {
    session
        .writes
        .views()
        .iter()
        .filter(|w| w.state != "idle")
        .map(|w| {
            let tx = w
                .tx_hash
                .as_deref()
                .map(|h| {
                    format!(
                        "<a href=\"{}/tx/{h}\">{}</a>",
                        session.client.network().explorer_url,
                        crate::view::truncate_address(h, 10, 8)
                    )
                })
                .unwrap_or_else(|| "-".to_string());
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                w.kind,
                w.state,
                tx,
                escape_html(w.message.as_deref().unwrap_or("")),
            )
        })
        .collect()
}

async fn index_html(State(state): State<DashboardState>) -> Html<String> {
    let session = &state.session;
    let views = session.cache.views(unix_now());
    let stats = stats_view(session);

    let rows: String = if views.is_empty() {
        "<tr><td colspan=\"6\" style=\"text-align:center;color:#666\">No contests loaded yet</td></tr>"
            .to_string()
    } else {
        views
            .iter()
            .map(|v| {
                format!(
                    "<tr><td>{}</td><td><a href=\"/contest/{}\" title=\"{}\">{}</a></td><td>{} ({}%)</td><td>{} ({}%)</td><td>${}</td><td>{}</td></tr>",
                    status_badge(v),
                    v.address,
                    escape_html(&v.question),
                    escape_html(&v.question_short),
                    escape_html(&v.option_a),
                    v.a_pct,
                    escape_html(&v.option_b),
                    v.b_pct,
                    v.total_pool,
                    v.time_left,
                )
            })
            .collect()
    };

    let count = |value: Option<&String>| {
        value
            .and_then(|v| v.parse::<f64>().ok())
            .map(format_large_number)
            .unwrap_or_else(|| "-".to_string())
    };
    let live_now = read_text(&session.active.state(), |a| a.len().to_string());
    let balance = read_text(&session.balance.state(), |b| format!("${}", format_usdc(*b)));
    let account = session
        .account()
        .map(crate::view::short_address)
        .unwrap_or_else(|| "not connected".to_string());

    let body = format!(
        r#"<h1>Momentum &middot; Prediction Contests</h1>
{banner}
<div class="cards">
  <div class="card"><div class="label">Contests</div><div class="value">{total}</div></div>
  <div class="card"><div class="label">Live Now</div><div class="value" style="color:#2ecc71">{live_now}</div></div>
  <div class="card"><div class="label">Resolved</div><div class="value">{resolved}</div></div>
  <div class="card"><div class="label">Fees Collected</div><div class="value">${fees}</div></div>
  <div class="card"><div class="label">Wallet {account}</div><div class="value" style="color:#3498db">{balance}</div></div>
</div>

<h2>Contests ({cached} cached)</h2>
<table>
  <tr><th>Status</th><th>Question</th><th>Option A</th><th>Option B</th><th>Pool</th><th>Time Left</th></tr>
  {rows}
</table>

<h2>Transactions</h2>
<table>
  <tr><th>Kind</th><th>State</th><th>Tx</th><th>Message</th></tr>
  {writes}
</table>

<div class="auto">Auto-refresh 5s | API: /api/contests, /api/stats, /api/account, /api/writes, /api/network</div>"#,
        banner = network_banner(session),
        total = count(stats.as_ref().map(|s| &s.total_contests)),
        resolved = count(stats.as_ref().map(|s| &s.resolved_contests)),
        fees = stats
            .as_ref()
            .map(|s| s.total_fees_collected.clone())
            .unwrap_or_else(|| "-".to_string()),
        cached = views.len(),
        writes = writes_rows(session),
    );

    page("Momentum", &body)
}

async fn contest_html(
    State(state): State<DashboardState>,
    Path(address): Path<String>,
) -> Response {
    let session = &state.session;
    let contest = match parse_contest(&address) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let view = match load_contest(session, contest).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let position = session.position(contest);
    let position_html = match position.ready() {
        Some(p) => {
            let p = PositionView::from(p);
            let claim = if p.can_claim {
                format!("<b style=\"color:#2ecc71\">Claimable: ${}</b> (POST /api/claim)", p.winnings)
            } else if p.has_claimed {
                "Winnings claimed".to_string()
            } else if view.status == ContestStatus::Resolved && p.total != "0.00" {
                "No winnings on this contest".to_string()
            } else {
                "-".to_string()
            };
            format!(
                "<tr><td>${}</td><td>${}</td><td>${}</td><td>{}</td></tr>",
                p.stake_a, p.stake_b, p.total, claim
            )
        }
        None => format!(
            "<tr><td colspan=\"4\" style=\"text-align:center;color:#666\">{}</td></tr>",
            read_text(&position, |_| String::new())
        ),
    };
    let allowance = read_text(&session.allowance(contest), |a| format!("${}", format_usdc(*a)));
    let winner = view
        .winner
        .as_deref()
        .map(|w| {
            let text = if w == "A" { &view.option_a } else { &view.option_b };
            format!("<h2>Winner: {}</h2>", escape_html(text))
        })
        .unwrap_or_default();

    let body = format!(
        r#"<h1><a href="/">Momentum</a> &middot; {question}</h1>
{banner}
<div class="cards">
  <div class="card"><div class="label">Status</div><div class="value">{badge}</div></div>
  <div class="card"><div class="label">Time Left</div><div class="value">{time_left}</div></div>
  <div class="card"><div class="label">Total Pool</div><div class="value">${pool}</div></div>
  <div class="card"><div class="label">Allowance</div><div class="value">{allowance}</div></div>
</div>
{winner}
<h2>Pool Split</h2>
<table>
  <tr><th>Option</th><th>Staked</th><th>Share</th></tr>
  <tr><td>A: {option_a}</td><td>${total_a}</td><td>{a_pct}%</td></tr>
  <tr><td>B: {option_b}</td><td>${total_b}</td><td>{b_pct}%</td></tr>
</table>

<h2>Your Position</h2>
<table>
  <tr><th>On A</th><th>On B</th><th>Total</th><th>Claim</th></tr>
  {position_html}
</table>

<div class="auto">Contract <a href="{explorer}">{address}</a> | API: /api/contests/{address}, POST /api/contests/{address}/preview, /api/approve, /api/stake</div>"#,
        question = escape_html(&view.question),
        banner = network_banner(session),
        badge = status_badge(&view),
        time_left = view.time_left,
        pool = view.total_pool,
        option_a = escape_html(&view.option_a),
        option_b = escape_html(&view.option_b),
        total_a = view.total_a,
        total_b = view.total_b,
        a_pct = view.a_pct,
        b_pct = view.b_pct,
        explorer = session.client.network().address_url(contest),
        address = view.address,
    );

    page("Momentum contest", &body).into_response()
}

async fn admin_html(State(state): State<DashboardState>) -> Response {
    let session = &state.session;
    match session.admin_access() {
        AdminAccess::Granted => {}
        AdminAccess::NotConnected => {
            return page(
                "Momentum admin",
                "<h1>Admin</h1><p>Connect the admin wallet (MOMENTUM_PRIVATE_KEY) to manage contests.</p>",
            )
            .into_response()
        }
        AdminAccess::Denied => return StatusCode::NOT_FOUND.into_response(),
    }

    let stats = stats_view(session);
    let field = |f: fn(&StatsView) -> String| {
        stats.as_ref().map(f).unwrap_or_else(|| "-".to_string())
    };

    let body = format!(
        r#"<h1><a href="/">Momentum</a> &middot; Admin</h1>
{banner}
<div class="cards">
  <div class="card"><div class="label">Contests</div><div class="value">{total}</div></div>
  <div class="card"><div class="label">Active</div><div class="value">{active}</div></div>
  <div class="card"><div class="label">Fees Collected</div><div class="value">${fees}</div></div>
  <div class="card"><div class="label">Withdrawable</div><div class="value" style="color:#2ecc71">${withdrawable}</div></div>
</div>

<h2>Transactions</h2>
<table>
  <tr><th>Kind</th><th>State</th><th>Tx</th><th>Message</th></tr>
  {writes}
</table>

<div class="auto">POST /api/admin/contests {{"question","option_a","option_b"}} | POST /api/admin/withdraw-fees</div>"#,
        banner = network_banner(session),
        total = field(|s| s.total_contests.clone()),
        active = field(|s| s.active_contests.clone()),
        fees = field(|s| s.total_fees_collected.clone()),
        withdrawable = field(|s| s.platform_fee_balance.clone().unwrap_or_else(|| "-".to_string())),
        writes = writes_rows(session),
    );

    page("Momentum admin", &body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{self, DEV_ADDRESS, DEV_KEY};
    use crate::client::{MomentumClient, UserStakes};

    async fn state(chain_id: u64, key: Option<&str>, admin: Option<&str>) -> State<DashboardState> {
        let url = testing::mock_node(chain_id).await;
        let mut config = testing::config(&url, key);
        if let Some(admin) = admin {
            config.contracts.admin = admin.to_string();
        }
        let client = MomentumClient::connect(&config).await.unwrap();
        State(DashboardState {
            session: Session::start(config, client),
        })
    }

    async fn body_text(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn create_request(question: &str) -> Json<CreateContestRequest> {
        Json(CreateContestRequest {
            question: question.into(),
            option_a: "Yes".into(),
            option_b: "Nope".into(),
        })
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>\"A&B\"</b>"),
            "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_read_text() {
        assert_eq!(read_text(&ReadState::<u8>::Disabled, |_| "x".into()), "-");
        assert_eq!(read_text(&ReadState::Ready(7u8), |v| v.to_string()), "7");
        assert_eq!(
            read_text(&ReadState::<u8>::Failed("boom".into()), |_| "x".into()),
            "unavailable"
        );
    }

    #[test]
    fn test_position_view() {
        let pos = UserPosition {
            stakes: UserStakes {
                on_a: U256::from(10_000_000u64),
                on_b: U256::ZERO,
                total: U256::from(10_000_000u64),
            },
            has_claimed: false,
            is_winner: true,
            winnings: U256::from(14_700_000u64),
        };
        let view = PositionView::from(&pos);
        assert_eq!(view.stake_a, "10.00");
        assert_eq!(view.winnings, "14.70");
        assert!(view.can_claim);
    }

    #[test]
    fn test_parse_contest_rejects_garbage() {
        assert!(parse_contest("0x1234").is_err());
        assert!(parse_contest("0x4452262C3c480F0B759f119489354c4D1ae5f8d8").is_ok());
    }

    #[tokio::test]
    async fn test_admin_routes_hidden_from_other_wallets() {
        let st = state(666_888, Some(DEV_KEY), None).await;
        assert_eq!(st.0.session.admin_access(), AdminAccess::Denied);

        let resp = api_admin_create(st.clone(), create_request("Will it rain in Lisbon?")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = api_admin_withdraw(st.clone()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = admin_html(st).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_page_asks_for_wallet_when_none_connected() {
        let st = state(666_888, None, None).await;
        let resp = admin_html(st.clone()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("Connect the admin wallet"));

        // the API itself stays hidden
        let resp = api_admin_create(st, create_request("Will it rain in Lisbon?")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_create_validates_form() {
        let st = state(666_888, Some(DEV_KEY), Some(DEV_ADDRESS)).await;
        assert_eq!(admin_html(st.clone()).await.status(), StatusCode::OK);

        let resp = api_admin_create(st, create_request("Short?")).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_text(resp).await.contains("question"));
    }

    #[tokio::test]
    async fn test_admin_create_on_wrong_network_is_refused() {
        let st = state(1, Some(DEV_KEY), Some(DEV_ADDRESS)).await;
        let resp = api_admin_create(st.clone(), create_request("Will it rain in Lisbon tomorrow?")).await;
        assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);
        assert!(body_text(resp).await.contains("wrong network"));

        let view = st.0.session.writes.get(WriteKind::CreateContest).status().to_view(WriteKind::CreateContest);
        assert_eq!(view.state, "failed");
    }

    #[tokio::test]
    async fn test_faucet_write_refusals() {
        let st = state(1, Some(DEV_KEY), None).await;
        let resp = api_faucet(st.clone()).await;
        assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);
        assert!(body_text(resp).await.contains("wrong network"));

        let writes = body_text(api_writes(st).await.into_response()).await;
        assert!(writes.contains("failed"));

        let st = state(666_888, None, None).await;
        assert_eq!(api_faucet(st).await.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_write_refusal_status() {
        assert_eq!(
            write_refused(WriteError::InFlight(WriteKind::Stake).into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(write_refused(ClientError::NoSigner).status(), StatusCode::PRECONDITION_FAILED);
        assert_eq!(
            write_refused(ClientError::Reverted(alloy::primitives::B256::ZERO)).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn test_claim_checks_contest_before_watching_it() {
        let st = state(666_888, Some(DEV_KEY), None).await;
        let req = Json(ContestRequest {
            contest: "0x4452262C3c480F0B759f119489354c4D1ae5f8d8".into(),
        });
        // the node cannot confirm the contest, so nothing is sent or watched
        let resp = api_claim(st.clone(), req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(st.0.session.watched_reads(), 0);
        assert_eq!(st.0.session.writes.get(WriteKind::Claim).status().label(), "idle");
    }

    #[tokio::test]
    async fn test_network_payload_for_wallets() {
        let st = state(666_888, None, None).await;
        let body = body_text(api_network(st).await.into_response()).await;
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["chain_id_hex"], "0xa2d08");
        assert_eq!(value["add_chain_on_error"], 4902);
        assert!(value["walletconnect_project_id"].is_string());
        assert_eq!(value["add_chain_request"]["method"], "wallet_addEthereumChain");
    }
}
