//! Bank accounts: the attribute type the shell stores.

use std::fmt::{self, Display};
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use warden_rbac::{AccessPolicy, Capability, Role};
use warden_store::{Attributes, MutationError, RefTarget, References};
use warden_types::PrincipalId;

/// Capability gating `interest`, granted to managers and admins.
pub fn apply_interest() -> Capability {
    Capability::Custom("apply_interest".to_string())
}

/// Adds the banking capabilities to the roles that should hold them.
pub fn banking_policy(mut policy: AccessPolicy) -> AccessPolicy {
    for role in [Role::Manager, Role::Admin] {
        if policy.knows(&role) {
            policy.grant(role, apply_interest());
        }
    }
    policy
}

/// Kind of account, with the kind-specific terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccountKind {
    Plain,
    /// Interest-bearing; `rate` is a percentage per application.
    Savings { rate: Decimal },
    /// May go negative down to `-overdraft`.
    Checking { overdraft: Decimal },
}

impl AccountKind {
    /// Parses `plain`, `savings <rate>` or `checking <overdraft>`.
    pub fn parse(args: &[&str]) -> Result<Self, String> {
        match args {
            [] | ["plain"] => Ok(Self::Plain),
            ["savings", rate] => Ok(Self::Savings {
                rate: parse_decimal(rate)?,
            }),
            ["checking", overdraft] => Ok(Self::Checking {
                overdraft: parse_decimal(overdraft)?,
            }),
            _ => Err("account kind must be: plain | savings <rate> | checking <overdraft>".into()),
        }
    }

    fn floor(&self) -> Decimal {
        match self {
            Self::Checking { overdraft } => -*overdraft,
            Self::Plain | Self::Savings { .. } => Decimal::ZERO,
        }
    }
}

impl Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => f.write_str("plain"),
            Self::Savings { rate } => write!(f, "savings ({rate}%)"),
            Self::Checking { overdraft } => write!(f, "checking (overdraft {overdraft})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub holder: String,
    pub balance: Decimal,
    pub kind: AccountKind,
    /// Principal responsible for the account.
    pub officer: Option<PrincipalId>,
}

impl Account {
    pub fn open(holder: impl Into<String>, kind: AccountKind, officer: Option<PrincipalId>) -> Self {
        Self {
            holder: holder.into(),
            balance: Decimal::ZERO,
            kind,
            officer,
        }
    }

    pub fn deposit(&mut self, amount: Decimal) -> Result<String, MutationError> {
        let amount = positive(amount)?;
        self.balance = self.balance.checked_add(amount).ok_or_else(overflow)?;
        Ok(format!("deposited {amount}"))
    }

    pub fn withdraw(&mut self, amount: Decimal) -> Result<String, MutationError> {
        let amount = positive(amount)?;
        let remaining = self.balance.checked_sub(amount).ok_or_else(overflow)?;
        if remaining < self.kind.floor() {
            return Err(MutationError::new(format!(
                "insufficient funds: balance {}, requested {amount}",
                self.balance
            )));
        }
        self.balance = remaining;
        Ok(format!("withdrew {amount}"))
    }

    /// Credits one period of interest, rounded to cents.
    pub fn apply_interest(&mut self) -> Result<String, MutationError> {
        let AccountKind::Savings { rate } = self.kind else {
            return Err(MutationError::new("interest only applies to savings accounts"));
        };
        let interest = self
            .balance
            .checked_mul(rate)
            .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(overflow)?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        self.balance = self.balance.checked_add(interest).ok_or_else(overflow)?;
        Ok(format!("interest of {interest} at {rate}%"))
    }
}

impl Attributes for Account {
    fn validate(&self) -> Result<(), MutationError> {
        if self.holder.trim().is_empty() {
            return Err(MutationError::new("holder name cannot be empty"));
        }
        match self.kind {
            AccountKind::Savings { rate } if rate.is_sign_negative() => {
                return Err(MutationError::new("interest rate cannot be negative"));
            }
            AccountKind::Checking { overdraft } if overdraft.is_sign_negative() => {
                return Err(MutationError::new("overdraft limit cannot be negative"));
            }
            _ => {}
        }
        if self.balance < self.kind.floor() {
            return Err(MutationError::new(format!(
                "balance {} is below the allowed minimum {}",
                self.balance,
                self.kind.floor()
            )));
        }
        Ok(())
    }
}

impl References for Account {
    fn references(&self, target: RefTarget<'_>) -> bool {
        self.officer
            .as_ref()
            .is_some_and(|officer| target.is_principal(officer))
    }

    fn detach(&mut self, target: RefTarget<'_>) -> Option<String> {
        let officer = self.officer.take_if(|officer| target.is_principal(officer))?;
        Some(format!("officer {officer} unassigned"))
    }
}

/// Parses a money amount or rate.
pub fn parse_decimal(raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw).map_err(|_| format!("'{raw}' is not a number"))
}

fn overflow() -> MutationError {
    MutationError::new("amount out of range")
}

fn positive(amount: Decimal) -> Result<Decimal, MutationError> {
    if amount > Decimal::ZERO {
        Ok(amount)
    } else {
        Err(MutationError::new(format!("amount must be positive, got {amount}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    fn account(kind: AccountKind, balance: Decimal) -> Account {
        Account {
            balance,
            ..Account::open("Alice", kind, None)
        }
    }

    #[test]
    fn deposit_and_withdraw_describe_the_change() {
        let mut acc = account(AccountKind::Plain, dec!(0));

        assert_eq!(acc.deposit(dec!(500)).unwrap(), "deposited 500");
        assert_eq!(acc.withdraw(dec!(120.50)).unwrap(), "withdrew 120.50");
        assert_eq!(acc.balance, dec!(379.50));
    }

    #[test_case(dec!(0) ; "zero")]
    #[test_case(dec!(-5) ; "negative")]
    fn non_positive_amounts_are_rejected(amount: Decimal) {
        let mut acc = account(AccountKind::Plain, dec!(100));

        assert!(acc.deposit(amount).is_err());
        assert!(acc.withdraw(amount).is_err());
        assert_eq!(acc.balance, dec!(100));
    }

    #[test]
    fn plain_accounts_cannot_overdraw() {
        let mut acc = account(AccountKind::Plain, dec!(50));

        let err = acc.withdraw(dec!(50.01)).unwrap_err();

        assert!(err.reason().contains("insufficient funds"));
        assert_eq!(acc.balance, dec!(50));
    }

    #[test]
    fn checking_accounts_use_the_overdraft_floor() {
        let mut acc = account(
            AccountKind::Checking {
                overdraft: dec!(100),
            },
            dec!(50),
        );

        assert!(acc.withdraw(dec!(150)).is_ok());
        assert_eq!(acc.balance, dec!(-100));
        assert!(acc.validate().is_ok());
        assert!(acc.withdraw(dec!(0.01)).is_err());
    }

    #[test]
    fn interest_rounds_to_cents() {
        let mut acc = account(AccountKind::Savings { rate: dec!(2.5) }, dec!(1000.10));

        assert_eq!(acc.apply_interest().unwrap(), "interest of 25.00 at 2.5%");
        assert_eq!(acc.balance, dec!(1025.10));
    }

    #[test]
    fn interest_needs_a_savings_account() {
        let mut acc = account(AccountKind::Plain, dec!(10));
        assert!(acc.apply_interest().is_err());
    }

    #[test_case(&[] => AccountKind::Plain ; "default")]
    #[test_case(&["savings", "3"] => AccountKind::Savings { rate: dec!(3) } ; "savings")]
    #[test_case(&["checking", "250"] => AccountKind::Checking { overdraft: dec!(250) } ; "checking")]
    fn kinds_parse(args: &[&str]) -> AccountKind {
        AccountKind::parse(args).unwrap()
    }

    #[test]
    fn invalid_terms_fail_validation() {
        assert!(account(AccountKind::Savings { rate: dec!(-1) }, dec!(0)).validate().is_err());
        assert!(
            account(AccountKind::Checking { overdraft: dec!(-1) }, dec!(0))
                .validate()
                .is_err()
        );
        assert!(Account::open("  ", AccountKind::Plain, None).validate().is_err());
    }

    #[test]
    fn officer_reference_detaches() {
        let officer = PrincipalId::parse("john").unwrap();
        let mut acc = Account::open("Alice", AccountKind::Plain, Some(officer.clone()));

        assert!(acc.references(RefTarget::Principal(&officer)));
        assert_eq!(
            acc.detach(RefTarget::Principal(&officer)).as_deref(),
            Some("officer john unassigned")
        );
        assert_eq!(acc.officer, None);
        assert_eq!(acc.detach(RefTarget::Principal(&officer)), None);
    }

    #[test]
    fn record_named_like_the_officer_is_not_the_officer() {
        let officer = PrincipalId::parse("john").unwrap();
        let accounts = warden_types::CollectionName::parse("accounts").unwrap();
        let key = warden_types::RecordKey::parse("john").unwrap();
        let mut acc = Account::open("Alice", AccountKind::Plain, Some(officer.clone()));
        let record = RefTarget::Record {
            collection: &accounts,
            key: &key,
        };

        assert!(!acc.references(record));
        assert_eq!(acc.detach(record), None);
        assert_eq!(acc.officer, Some(officer));
    }

    #[test]
    fn overflow_is_an_error_not_a_panic() {
        let mut acc = account(AccountKind::Plain, Decimal::MAX);
        assert_eq!(
            acc.deposit(Decimal::ONE).unwrap_err().reason(),
            "amount out of range"
        );
        assert_eq!(acc.balance, Decimal::MAX);

        let mut overdrawn = account(
            AccountKind::Checking {
                overdraft: Decimal::MAX,
            },
            Decimal::MIN,
        );
        assert!(overdrawn.withdraw(Decimal::ONE).is_err());
        assert_eq!(overdrawn.balance, Decimal::MIN);

        let mut rich = account(AccountKind::Savings { rate: dec!(200) }, Decimal::MAX);
        assert!(rich.apply_interest().is_err());
        assert_eq!(rich.balance, Decimal::MAX);
    }

    #[test]
    fn banking_policy_grants_interest_to_managers() {
        let policy = banking_policy(warden_rbac::StandardPolicies::hierarchical());

        assert!(policy.allows(&Role::Manager, &apply_interest()));
        assert!(policy.allows(&Role::Admin, &apply_interest()));
        assert!(!policy.allows(&Role::Staff, &apply_interest()));
    }
}
