//! Sign-in, sign-out and account commands.

use serde::Serialize;

use super::{Output, json, require_user};
use crate::Result;
use crate::Taskflow;
use crate::access::NavItem;
use crate::client::AccountSummary;

/// Result of `tf login` / `tf register`.
#[derive(Debug, Serialize)]
pub struct SignedIn {
    pub message: String,
    pub account: AccountSummary,
}

impl Output for SignedIn {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "{}\n  Account: {} ({})",
            self.message, self.account.email, self.account.role
        )
    }
}

pub async fn login(app: &Taskflow, email: &str, password: &str) -> Result<SignedIn> {
    let user = app.login(email, password).await?;
    Ok(SignedIn {
        message: "Logged in successfully".to_string(),
        account: AccountSummary::from(&user),
    })
}

pub async fn register(app: &Taskflow, email: &str, password: &str) -> Result<SignedIn> {
    let user = app.register(email, password).await?;
    Ok(SignedIn {
        message: "Account created successfully".to_string(),
        account: AccountSummary::from(&user),
    })
}

/// Result of `tf logout`.
#[derive(Debug, Serialize)]
pub struct LoggedOut {
    pub was_signed_in: bool,
}

impl Output for LoggedOut {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.was_signed_in {
            "Logged out".to_string()
        } else {
            "Not logged in; local session cleared".to_string()
        }
    }
}

pub async fn logout(app: &Taskflow) -> Result<LoggedOut> {
    let was_signed_in = app.session().has_token();
    if was_signed_in {
        app.logout().await;
    } else {
        // Nothing to tell the server; still drop any stale user record.
        app.session().sign_out();
        app.query().reset();
    }
    Ok(LoggedOut { was_signed_in })
}

/// Result of `tf whoami`.
#[derive(Debug, Serialize)]
pub struct Whoami {
    pub account: AccountSummary,
    pub navigation: Vec<NavItem>,
}

impl Output for Whoami {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let sections: Vec<&str> = self.navigation.iter().map(|item| item.title).collect();
        format!(
            "{} (#{})\n  Role: {}\n  Sections: {}",
            self.account.email,
            self.account.id,
            self.account.role,
            sections.join(", ")
        )
    }
}

pub async fn whoami(app: &Taskflow) -> Result<Whoami> {
    let user = require_user(app).await?;
    Ok(Whoami {
        account: AccountSummary::from(&user),
        navigation: app.navigation(),
    })
}
