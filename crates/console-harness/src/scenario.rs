//! Console scenario routines.
//!
//! Higher-level steps shared by console tests: login, menu navigation and
//! creating or deleting resources through the UI. Every resource created
//! here is recorded on the test's tracker so teardown can remove it.

use crate::assertion::{expect_eq, expect_len};
use crate::driver::ElementHandle;
use crate::locator::{Locator, Selector, WaitCondition};
use crate::resource::ResourceKind;
use crate::result::{HarnessError, HarnessResult};
use crate::retry::{retry_on_stale, retry_with, RetrySpec};
use crate::session::TestCase;
use crate::table::query_table;
use std::time::Duration;
use tracing::info;

/// Table on every resource list page
pub const LIST_TABLE: &str = "list_resource__table";
/// Column holding each row's action menu
pub const MENU_COLUMN: &str = "$ref";
/// Organization test resources are created in
pub const TEST_ORGANIZATION: &str = "acme";
/// Password given to created users and databases
pub const TEST_PASSWORD: &str = "passw0rd";

const SHORT_UNIQUE_ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SHORT_UNIQUE_WINDOW_MS: u64 = 30 * 24 * 3600 * 1000;
const MENU_CLICK_RETRIES: u32 = 2;

/// Fields that make up a resource's backend path, outermost first
const PATH_FIELDS: [&str; 4] = ["organization", "project", "database", "name"];

/// Short name unique within a 30 day window at 10ms granularity.
///
/// `prefix` defaults to `s`.
#[must_use]
pub fn short_unique(prefix: Option<&str>) -> String {
    let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
    short_unique_at(prefix, now)
}

/// [`short_unique`] for a given epoch time in milliseconds
#[must_use]
pub fn short_unique_at(prefix: Option<&str>, epoch_ms: u64) -> String {
    let mut name = prefix.unwrap_or("s").to_string();
    let mut value = (epoch_ms % SHORT_UNIQUE_WINDOW_MS) / 10;
    while value > 0 {
        name.push(char::from(SHORT_UNIQUE_ALPHABET[(value % 36) as usize]));
        value /= 36;
    }
    name
}

/// Backend path of a resource created from these form fields
fn resource_path(name: &str, fields: &[(&str, &str)]) -> String {
    let segments: Vec<&str> = PATH_FIELDS
        .iter()
        .filter_map(|key| fields.iter().find(|(k, _)| k == key).map(|(_, v)| *v))
        .collect();
    if segments.is_empty() {
        name.to_string()
    } else {
        segments.join("/")
    }
}

impl TestCase<'_> {
    /// Log in through the login form and wait for the home page
    pub async fn login(&self, organization: &str, user: &str, password: &str) -> HarnessResult<()> {
        self.session().get(None).await?;
        let waiter = self.waiter();
        waiter.send_keys(&Locator::test_id("organization"), organization).await?;
        waiter.send_keys(&Locator::test_id("username"), user).await?;
        waiter.send_keys(&Locator::test_id("password"), password).await?;
        waiter.click(&Locator::test_id("login_button")).await?;
        let path = waiter.get_text(&Locator::test_id("path_component")).await?;
        expect_eq(&path.as_str(), &"Home", "page after login")?;
        waiter.wait_for(&Locator::test_id("banner-done"), WaitCondition::Visible).await?;
        info!(organization, user, "logged in");
        Ok(())
    }

    /// Log in with the configured bootstrap credential
    pub async fn login_admin(&self) -> HarnessResult<()> {
        let config = self.session().config();
        self.login(&config.admin_organization, &config.admin_user, &config.admin_password)
            .await
    }

    /// Wait for the REST activity spinner to report completion
    pub async fn wait_rest_complete(&self) -> HarnessResult<()> {
        self.waiter()
            .wait_for(&Locator::test_id("rest_spinner__complete"), WaitCondition::Visible)
            .await
            .map(|_| ())
    }

    /// Open a resource list from the navigation menu
    pub async fn click_menu(&self, resource: &str) -> HarnessResult<()> {
        let waiter = self.waiter();
        let button = Locator::test_id(format!("menu-button-{resource}"));
        let button = &button;
        retry_on_stale(MENU_CLICK_RETRIES, Duration::ZERO, move || async move {
            waiter.click(button).await
        })
        .await?;
        self.wait_rest_complete().await
    }

    /// Open the element's popup menu and click `item` in it
    pub async fn click_popup_menu(&self, element: &ElementHandle, item: &str) -> HarnessResult<()> {
        let waiter = self.waiter();
        let driver = waiter.driver();
        let toggles = driver
            .find_all(Some(element), &Selector::test_id("menu-toggle"))
            .await?;
        expect_len(&toggles, 1, "menu-toggle")?;
        driver.click(&toggles[0]).await?;

        let popup = waiter
            .wait_for(&Locator::test_id("menu-popup"), WaitCondition::Visible)
            .await?;
        let items = driver.find_all(Some(&popup), &Selector::test_id(item)).await?;
        expect_len(&items, 1, item)?;
        driver.click(&items[0]).await
    }

    /// Click an entry of the user menu
    pub async fn click_user_menu(&self, item: &str) -> HarnessResult<()> {
        let menu = self
            .waiter()
            .wait_for(&Locator::test_id("user-menu"), WaitCondition::Visible)
            .await?;
        self.click_popup_menu(&menu, item).await
    }

    /// Create a resource through its list page's create form.
    ///
    /// `fields` are form input names and values, typed in order.
    pub async fn create_resource_ui(
        &mut self,
        kind: ResourceKind,
        name: &str,
        fields: &[(&str, &str)],
    ) -> HarnessResult<()> {
        self.click_menu(kind.as_str()).await?;
        let waiter = self.waiter();
        waiter.click(&Locator::test_id("list_resource__create_button")).await?;
        for (field, value) in fields {
            let input = waiter.wait_input_by_name(field, WaitCondition::Visible).await?;
            waiter.driver().send_keys(&input, value).await?;
        }
        waiter.click(&Locator::test_id("create_resource__create_button")).await?;
        let path = resource_path(name, fields);
        info!(%kind, %path, "created resource");
        self.tracker_mut().record_creation(kind, path);
        self.wait_rest_complete().await
    }

    /// Delete a resource from its list page's row menu
    pub async fn delete_resource_ui(&mut self, kind: ResourceKind, name: &str) -> HarnessResult<()> {
        self.click_menu(kind.as_str()).await?;
        let waiter = self.waiter();
        let table = Locator::test_id(LIST_TABLE);
        let table = &table;
        let cells = retry_with(RetrySpec::eventual(), move || async move {
            let cells = query_table(
                &waiter,
                table,
                Some("name".into()),
                Some(name),
                Some(MENU_COLUMN.into()),
            )
            .await?;
            expect_len(&cells, 1, &format!("rows named '{name}'"))?;
            Ok::<_, HarnessError>(cells)
        })
        .await?;
        self.click_popup_menu(&cells[0], "delete_button").await?;
        waiter.click(&Locator::test_id("dialog_button_yes")).await?;

        let tracked = self
            .tracker()
            .names(kind)
            .iter()
            .find(|path| path.rsplit('/').next() == Some(name))
            .cloned();
        let path = tracked.unwrap_or_else(|| name.to_string());
        info!(%kind, %path, "deleted resource");
        self.tracker_mut().record_deletion(kind, &path);
        Ok(())
    }

    /// Create a user in `acme`; returns its name
    pub async fn create_user(&mut self) -> HarnessResult<String> {
        let name = short_unique(Some("u"));
        self.create_resource_ui(
            ResourceKind::Users,
            &name,
            &[
                ("organization", TEST_ORGANIZATION),
                ("name", &name),
                ("password", TEST_PASSWORD),
                ("accessRule.allow.0", "all:acme"),
            ],
        )
        .await?;
        Ok(name)
    }

    /// Create a project in `acme`; returns its name
    pub async fn create_project(&mut self) -> HarnessResult<String> {
        let name = short_unique(Some("p"));
        self.create_resource_ui(
            ResourceKind::Projects,
            &name,
            &[
                ("organization", TEST_ORGANIZATION),
                ("name", &name),
                ("sla", "dev"),
                ("tier", "n0.nano"),
            ],
        )
        .await?;
        Ok(name)
    }

    /// Create a database in a project; returns its name
    pub async fn create_database(&mut self, project: &str) -> HarnessResult<String> {
        let name = short_unique(Some("d"));
        self.create_resource_ui(
            ResourceKind::Databases,
            &name,
            &[
                ("organization", TEST_ORGANIZATION),
                ("project", project),
                ("name", &name),
                ("dbaPassword", TEST_PASSWORD),
            ],
        )
        .await?;
        Ok(name)
    }

    /// Create a backup of a database; returns its name
    pub async fn create_backup(&mut self, project: &str, database: &str) -> HarnessResult<String> {
        let name = short_unique(Some("b"));
        self.create_resource_ui(
            ResourceKind::Backups,
            &name,
            &[
                ("organization", TEST_ORGANIZATION),
                ("project", project),
                ("database", database),
                ("name", &name),
            ],
        )
        .await?;
        Ok(name)
    }

    /// Delete a user through the UI
    pub async fn delete_user(&mut self, name: &str) -> HarnessResult<()> {
        self.delete_resource_ui(ResourceKind::Users, name).await
    }

    /// Delete a project through the UI
    pub async fn delete_project(&mut self, name: &str) -> HarnessResult<()> {
        self.delete_resource_ui(ResourceKind::Projects, name).await
    }

    /// Delete a database through the UI
    pub async fn delete_database(&mut self, name: &str) -> HarnessResult<()> {
        self.delete_resource_ui(ResourceKind::Databases, name).await
    }

    /// Delete a backup through the UI
    pub async fn delete_backup(&mut self, name: &str) -> HarnessResult<()> {
        self.delete_resource_ui(ResourceKind::Backups, name).await
    }

    /// Create a resource over REST and track it.
    ///
    /// Only a non-empty `path` can be tracked; without one the name lives in
    /// the body and teardown relies on relisting.
    pub async fn create_resource_rest(
        &mut self,
        kind: ResourceKind,
        path: Option<&str>,
        body: &str,
    ) -> HarnessResult<String> {
        let response = self.rest().create(kind, path, body).await?;
        if let Some(path) = path.map(|p| p.trim_start_matches('/')).filter(|p| !p.is_empty()) {
            self.tracker_mut().record_creation(kind, path);
        }
        Ok(response)
    }
}
