//! Integration tests for the vault contract.
//!
//! Every test runs against the shared fork fixture: real token behaviors
//! (including USDT's), a funded swap venue and a money market with cash.

mod common;

use std::sync::Arc;

use chamber_contracts::events::{BoughtNative, Deposited, Event, Withdrawn};
use chamber_contracts::VaultError;
use chamber_protocol::config::{NATIVE_CURRENCY, ONE_NATIVE};
use chamber_protocol::token::{StandardToken, TokenQuirks};
use chamber_protocol::venue::SwapVenue;
use chamber_protocol::{Address, Erc20};
use common::{units, Fork};

// ---------------------------------------------------------------------------
// Deposit / withdraw
// ---------------------------------------------------------------------------

#[test]
fn deposit_then_partial_withdraw() -> anyhow::Result<()> {
    let f = Fork::new();
    let dai = f.dai.address();

    f.deposit(&*f.dai, 100)?;
    let remaining = f.vault.withdraw(&f.user, &dai, 50)?;

    assert_eq!(remaining, 50);
    assert_eq!(f.vault.balance_of(&dai), 50);
    assert_eq!(f.dai.balance_of(&f.vault.address()), 50);
    Ok(())
}

#[test]
fn two_tokens_tracked_independently() -> anyhow::Result<()> {
    let f = Fork::new();

    f.deposit(&*f.dai, 100)?;
    f.deposit(&*f.usdc, 100)?;
    f.vault.withdraw(&f.user, &f.dai.address(), 50)?;
    f.vault.withdraw(&f.user, &f.usdc.address(), 50)?;

    assert_eq!(f.vault.balance_of(&f.dai.address()), 50);
    assert_eq!(f.vault.balance_of(&f.usdc.address()), 50);
    Ok(())
}

#[test]
fn sequential_deposits_add_up() -> anyhow::Result<()> {
    let f = Fork::new();
    let (a, b) = (units(30, 18), units(70, 18));

    assert_eq!(f.deposit(&*f.dai, a)?, a);
    assert_eq!(f.deposit(&*f.dai, b)?, b);

    assert_eq!(f.vault.balance_of(&f.dai.address()), a + b);
    Ok(())
}

#[test]
fn deposit_withdraw_round_trip_restores_balances() -> anyhow::Result<()> {
    let f = Fork::new();
    let dai = f.dai.address();
    let user_before = f.dai.balance_of(&f.user);

    f.deposit(&*f.dai, units(100, 18))?;
    f.vault.withdraw(&f.user, &dai, units(100, 18))?;

    assert_eq!(f.vault.balance_of(&dai), 0);
    assert_eq!(f.dai.balance_of(&f.user), user_before);
    assert_eq!(f.dai.balance_of(&f.vault.address()), 0);
    Ok(())
}

#[test]
fn over_withdraw_fails_and_changes_nothing() -> anyhow::Result<()> {
    let f = Fork::new();
    let dai = f.dai.address();
    f.deposit(&*f.dai, 100)?;

    let err = f.vault.withdraw(&f.user, &dai, 101).unwrap_err();
    assert!(matches!(
        err,
        VaultError::InsufficientBalance {
            available: 100,
            requested: 101,
            ..
        }
    ));
    assert_eq!(f.vault.balance_of(&dai), 100);
    assert_eq!(f.dai.balance_of(&f.vault.address()), 100);
    Ok(())
}

#[test]
fn deposit_without_approval_fails() {
    let f = Fork::new();
    let err = f
        .vault
        .deposit(&f.user, &f.dai.address(), 100)
        .unwrap_err();
    assert!(matches!(err, VaultError::TransferFailed(_)));
    assert_eq!(f.vault.balance_of(&f.dai.address()), 0);
}

#[test]
fn false_returning_token_is_a_failed_transfer() {
    let f = Fork::new();
    let token = Arc::new(StandardToken::with_quirks(
        Address::from_label("quiet-failure"),
        "QF",
        18,
        f.deployer,
        TokenQuirks {
            false_on_failure: true,
            ..TokenQuirks::default()
        },
    ));
    f.chain.register_token(token.clone());
    f.mint(&token, &f.user, 10);

    // Approve less than requested: the token returns false instead of erroring.
    token.approve(&f.user, &f.vault.address(), 5).unwrap();
    let err = f.vault.deposit(&f.user, &token.address(), 10).unwrap_err();

    assert!(matches!(err, VaultError::TransferFailed(_)));
    assert_eq!(f.vault.balance_of(&token.address()), 0);
    assert_eq!(token.balance_of(&f.user), 10);
}

#[test]
fn anyone_may_deposit_but_only_owner_withdraws() -> anyhow::Result<()> {
    let f = Fork::new();
    let stranger = Address::from_label("stranger");
    f.mint(&f.dai, &stranger, 500);

    f.deposit_from(&stranger, &*f.dai, 500)?;
    assert_eq!(f.vault.balance_of(&f.dai.address()), 500);

    let err = f
        .vault
        .withdraw(&stranger, &f.dai.address(), 500)
        .unwrap_err();
    assert!(matches!(err, VaultError::NotOwner { caller } if caller == stranger));

    // Withdrawals always go to the owner.
    f.vault.withdraw(&f.user, &f.dai.address(), 500)?;
    assert_eq!(f.dai.balance_of(&stranger), 0);
    Ok(())
}

#[test]
fn zero_amounts_rejected() {
    let f = Fork::new();
    let dai = f.dai.address();
    assert!(matches!(
        f.vault.deposit(&f.user, &dai, 0),
        Err(VaultError::InvalidAmount)
    ));
    assert!(matches!(
        f.vault.withdraw(&f.user, &dai, 0),
        Err(VaultError::InvalidAmount)
    ));
    assert!(matches!(
        f.vault.withdraw_native(&f.user, 0),
        Err(VaultError::InvalidAmount)
    ));
    assert!(matches!(
        f.vault.buy_native(&f.user, &dai, 0),
        Err(VaultError::InvalidAmount)
    ));
    assert!(matches!(
        f.vault.supply_native(&f.user, 0),
        Err(VaultError::InvalidAmount)
    ));
    assert!(matches!(
        f.vault.redeem_native(&f.user, 0),
        Err(VaultError::InvalidAmount)
    ));
}

#[test]
fn native_pseudo_identifier_is_not_a_ledger_token() {
    let f = Fork::new();
    assert!(matches!(
        f.vault.deposit(&f.user, &NATIVE_CURRENCY, 1),
        Err(VaultError::UnsupportedToken(t)) if t == NATIVE_CURRENCY
    ));
    assert!(matches!(
        f.vault.withdraw(&f.user, &NATIVE_CURRENCY, 1),
        Err(VaultError::UnsupportedToken(_))
    ));
    assert!(matches!(
        f.vault.buy_native(&f.user, &NATIVE_CURRENCY, 1),
        Err(VaultError::UnsupportedToken(_))
    ));
    assert_eq!(f.vault.balance_of(&NATIVE_CURRENCY), 0);
}

#[test]
fn usdt_deposit_and_withdraw() -> anyhow::Result<()> {
    let f = Fork::new();
    let usdt = f.usdt.address();
    let amount = units(1_000, 6);

    // A stale non-zero allowance must not break the next approval.
    f.usdt.approve(&f.user, &f.vault.address(), 1)?;
    f.deposit(&*f.usdt, amount)?;
    f.deposit(&*f.usdt, amount)?;
    assert_eq!(f.vault.balance_of(&usdt), 2 * amount);

    f.vault.withdraw(&f.user, &usdt, amount)?;
    assert_eq!(f.vault.balance_of(&usdt), amount);
    assert_eq!(f.usdt.balance_of(&f.vault.address()), amount);
    Ok(())
}

#[test]
fn fee_on_transfer_deposit_credits_what_arrived() -> anyhow::Result<()> {
    let f = Fork::new();
    let token = Arc::new(StandardToken::with_quirks(
        Address::from_label("deflationary"),
        "DEFL",
        18,
        f.deployer,
        TokenQuirks::fee_on_transfer(100),
    ));
    f.chain.register_token(token.clone());
    f.mint(&token, &f.user, units(100, 18));

    let credited = f.deposit(&*token, units(100, 18))?;

    assert_eq!(credited, units(99, 18));
    assert_eq!(f.vault.balance_of(&token.address()), credited);
    assert_eq!(token.balance_of(&f.vault.address()), credited);

    f.vault.withdraw(&f.user, &token.address(), credited)?;
    assert_eq!(token.balance_of(&f.vault.address()), 0);
    Ok(())
}

// ---------------------------------------------------------------------------
// Native currency
// ---------------------------------------------------------------------------

#[test]
fn unsolicited_native_transfer_then_full_withdraw() -> anyhow::Result<()> {
    let f = Fork::new();
    let vault = f.vault.address();
    assert_eq!(f.vault.native_balance(), 0);

    f.chain.send_native(&f.user, &vault, 3 * ONE_NATIVE)?;
    assert_eq!(f.vault.native_balance(), 3 * ONE_NATIVE);

    let remaining = f.vault.withdraw_native(&f.user, 3 * ONE_NATIVE)?;
    assert_eq!(remaining, 0);
    assert_eq!(f.vault.native_balance(), 0);
    assert_eq!(f.chain.native_balance(&f.user), 100 * ONE_NATIVE);
    Ok(())
}

#[test]
fn native_withdraw_checks_custody_and_owner() -> anyhow::Result<()> {
    let f = Fork::new();
    f.chain
        .send_native(&f.user, &f.vault.address(), ONE_NATIVE)?;

    assert!(matches!(
        f.vault.withdraw_native(&f.user, ONE_NATIVE + 1),
        Err(VaultError::InsufficientBalance { token, .. }) if token == NATIVE_CURRENCY
    ));
    assert!(matches!(
        f.vault
            .withdraw_native(&Address::from_label("thief"), ONE_NATIVE),
        Err(VaultError::NotOwner { .. })
    ));
    assert_eq!(f.vault.native_balance(), ONE_NATIVE);
    Ok(())
}

// ---------------------------------------------------------------------------
// Buying native currency
// ---------------------------------------------------------------------------

#[test]
fn buy_native_spends_ledger_and_grows_custody() -> anyhow::Result<()> {
    let f = Fork::new();
    let dai = f.dai.address();
    f.deposit(&*f.dai, units(1_000, 18))?;

    let proceeds = f.vault.buy_native(&f.user, &dai, units(400, 18))?;

    assert!(proceeds > 0);
    assert_eq!(f.vault.native_balance(), proceeds);
    assert_eq!(f.vault.balance_of(&dai), units(600, 18));
    assert_eq!(f.dai.balance_of(&f.vault.address()), units(600, 18));
    assert_eq!(f.dai.allowance(&f.vault.address(), &f.venue.address()), 0);

    let logged = f.chain.logs_named(BoughtNative::NAME);
    assert_eq!(logged.len(), 1);
    let event: BoughtNative = logged[0].decode()?;
    assert_eq!(event.proceeds, proceeds);
    Ok(())
}

#[test]
fn buy_native_with_usdt() -> anyhow::Result<()> {
    let f = Fork::new();
    let usdt = f.usdt.address();
    f.deposit(&*f.usdt, units(2_000, 6))?;

    let first = f.vault.buy_native(&f.user, &usdt, units(1_000, 6))?;
    let second = f.vault.buy_native(&f.user, &usdt, units(1_000, 6))?;

    assert!(first > 0 && second > 0);
    assert_eq!(f.vault.balance_of(&usdt), 0);
    assert_eq!(f.vault.native_balance(), first + second);
    Ok(())
}

#[test]
fn buy_native_over_ledger_balance_fails() -> anyhow::Result<()> {
    let f = Fork::new();
    let dai = f.dai.address();
    f.deposit(&*f.dai, 100)?;

    assert!(matches!(
        f.vault.buy_native(&f.user, &dai, 101),
        Err(VaultError::InsufficientBalance { .. })
    ));
    assert_eq!(f.vault.balance_of(&dai), 100);
    Ok(())
}

#[test]
fn buy_native_rejects_tokens_outside_allow_list() -> anyhow::Result<()> {
    let f = Fork::new();
    let weth = f.weth.address();
    f.weth.deposit(&f.user, ONE_NATIVE)?;
    f.deposit(&*f.weth, ONE_NATIVE)?;

    assert!(matches!(
        f.vault.buy_native(&f.user, &weth, ONE_NATIVE),
        Err(VaultError::UnsupportedToken(t)) if t == weth
    ));
    assert_eq!(f.vault.balance_of(&weth), ONE_NATIVE);
    Ok(())
}

#[test]
fn failed_swap_restores_ledger() -> anyhow::Result<()> {
    let f = Fork::new();
    let dai = f.dai.address();
    f.deposit(&*f.dai, 100)?;

    // 1 wei of DAI is worth less than 1 wei of native.
    let err = f.vault.buy_native(&f.user, &dai, 1).unwrap_err();

    assert!(matches!(err, VaultError::SwapFailed(_)));
    assert_eq!(f.vault.balance_of(&dai), 100);
    assert_eq!(f.dai.balance_of(&f.vault.address()), 100);
    assert_eq!(f.vault.native_balance(), 0);
    assert_eq!(f.dai.allowance(&f.vault.address(), &f.venue.address()), 0);
    Ok(())
}

#[test]
fn buy_native_is_owner_gated() -> anyhow::Result<()> {
    let f = Fork::new();
    f.deposit(&*f.dai, units(10, 18))?;
    assert!(matches!(
        f.vault
            .buy_native(&Address::from_label("stranger"), &f.dai.address(), units(10, 18)),
        Err(VaultError::NotOwner { .. })
    ));
    Ok(())
}

// ---------------------------------------------------------------------------
// Lending
// ---------------------------------------------------------------------------

#[test]
fn supply_then_redeem_returns_native() -> anyhow::Result<()> {
    let f = Fork::new();
    f.chain
        .send_native(&f.user, &f.vault.address(), 10 * ONE_NATIVE)?;

    let minted = f.vault.supply_native(&f.user, 5 * ONE_NATIVE)?;
    assert_eq!(minted, f.vault.receipt_balance());
    let after_supply = f.vault.native_balance();
    assert_eq!(after_supply, 5 * ONE_NATIVE);

    f.chain.mine(1_000);
    let received = f.vault.redeem_native(&f.user, f.vault.receipt_balance())?;

    assert!(received > 5 * ONE_NATIVE);
    assert!(f.vault.native_balance() > after_supply);
    assert_eq!(f.vault.receipt_balance(), 0);
    Ok(())
}

#[test]
fn supply_more_than_custody_fails() {
    let f = Fork::new();
    assert!(matches!(
        f.vault.supply_native(&f.user, ONE_NATIVE),
        Err(VaultError::InsufficientBalance { token, .. }) if token == NATIVE_CURRENCY
    ));
    assert_eq!(f.vault.receipt_balance(), 0);
}

#[test]
fn redeem_more_than_held_surfaces_market_reason() -> anyhow::Result<()> {
    let f = Fork::new();
    f.chain
        .send_native(&f.user, &f.vault.address(), ONE_NATIVE)?;
    let minted = f.vault.supply_native(&f.user, ONE_NATIVE)?;

    let err = f.vault.redeem_native(&f.user, minted + 1).unwrap_err();
    match err {
        VaultError::RedeemFailed(reason) => assert!(reason.contains("insufficient receipt")),
        other => panic!("expected RedeemFailed, got {other:?}"),
    }
    assert_eq!(f.vault.receipt_balance(), minted);
    assert_eq!(f.vault.native_balance(), 0);
    Ok(())
}

#[test]
fn lending_is_owner_gated() -> anyhow::Result<()> {
    let f = Fork::new();
    let stranger = Address::from_label("stranger");
    f.chain
        .send_native(&f.user, &f.vault.address(), ONE_NATIVE)?;

    assert!(matches!(
        f.vault.supply_native(&stranger, ONE_NATIVE),
        Err(VaultError::NotOwner { .. })
    ));
    let minted = f.vault.supply_native(&f.user, ONE_NATIVE)?;
    assert!(matches!(
        f.vault.redeem_native(&stranger, minted),
        Err(VaultError::NotOwner { .. })
    ));
    Ok(())
}

// ---------------------------------------------------------------------------
// Events and snapshots
// ---------------------------------------------------------------------------

#[test]
fn deposit_and_withdraw_events() -> anyhow::Result<()> {
    let f = Fork::new();
    let dai = f.dai.address();
    let amount = units(100, 18);
    f.deposit(&*f.dai, amount)?;
    f.vault.withdraw(&f.user, &dai, units(40, 18))?;

    let deposited: Deposited = f.chain.logs_named(Deposited::NAME)[0].decode()?;
    assert_eq!(
        deposited,
        Deposited {
            token: dai,
            from: f.user,
            amount,
        }
    );

    let withdrawn = &f.chain.logs_named(Withdrawn::NAME)[0];
    assert_eq!(withdrawn.emitter, f.vault.address());
    let withdrawn: Withdrawn = withdrawn.decode()?;
    assert_eq!(withdrawn.remaining, units(60, 18));
    assert_eq!(withdrawn.to, f.user);
    Ok(())
}

#[test]
fn snapshot_reports_all_holdings() -> anyhow::Result<()> {
    let f = Fork::new();
    f.deposit(&*f.dai, 100)?;
    f.chain
        .send_native(&f.user, &f.vault.address(), 2 * ONE_NATIVE)?;
    let minted = f.vault.supply_native(&f.user, ONE_NATIVE)?;

    let snapshot = f.vault.snapshot();
    assert_eq!(snapshot.owner, f.user);
    assert_eq!(snapshot.factory, f.factory.address());
    assert_eq!(snapshot.ledger.balance_of(&f.dai.address()), 100);
    assert_eq!(snapshot.native, ONE_NATIVE);
    assert_eq!(snapshot.receipt, minted);

    let json = serde_json::to_value(&snapshot)?;
    assert_eq!(json["native"], ONE_NATIVE.to_string());
    Ok(())
}
