//! In-memory DOM driver for testing the harness without a browser.
//!
//! [`MockDriver`] keeps a small element tree. Tests mount [`MockElement`]s,
//! re-render parts of the tree with [`MockDriver::replace`], and register
//! click hooks that mutate the tree the way the console would after a user
//! action. Nodes removed from the tree keep their ids, so handles resolved
//! before a re-render fail with `Stale`, just like a real browser.

use crate::driver::{ElementHandle, UiDriver};
use crate::locator::{Selector, TEST_ID_ATTRIBUTE};
use crate::result::{HarnessError, HarnessResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// PNG signature returned as screenshot bytes
pub const MOCK_PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

// =============================================================================
// ELEMENT BUILDER
// =============================================================================

/// Declarative element used to build the mock tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    visible: bool,
    children: Vec<MockElement>,
}

impl MockElement {
    /// Element with the given tag
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            text: String::new(),
            visible: true,
            children: Vec::new(),
        }
    }

    /// Set `data-testid`
    #[must_use]
    pub fn test_id(self, id: impl Into<String>) -> Self {
        self.attr(TEST_ID_ATTRIBUTE, id)
    }

    /// Set `name`
    #[must_use]
    pub fn name(self, name: impl Into<String>) -> Self {
        self.attr("name", name)
    }

    /// Set DOM `id`
    #[must_use]
    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    /// Set an arbitrary attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set own text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Mark as not displayed
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Append a child
    #[must_use]
    pub fn child(mut self, child: MockElement) -> Self {
        self.children.push(child);
        self
    }

    /// Append several children
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = MockElement>) -> Self {
        self.children.extend(children);
        self
    }

    /// `<table>` with a `thead` of `th[data-testid]` and a `tbody` of text cells
    #[must_use]
    pub fn table<R, C>(test_id: &str, headers: &[&str], rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = String>,
    {
        let head = Self::new("tr").children(
            headers
                .iter()
                .map(|h| Self::new("th").test_id(*h).text(*h)),
        );
        let body = rows.into_iter().map(|cells| {
            Self::new("tr").children(cells.into_iter().map(|c| Self::new("td").text(c)))
        });
        Self::new("table")
            .test_id(test_id)
            .child(Self::new("thead").child(head))
            .child(Self::new("tbody").children(body))
    }
}

// =============================================================================
// DOM
// =============================================================================

#[derive(Debug)]
struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    visible: bool,
    children: Vec<usize>,
    parent: Option<usize>,
    attached: bool,
    select_pending: bool,
}

/// Element tree behind a [`MockDriver`]
#[derive(Debug)]
pub struct MockDom {
    nodes: Vec<Node>,
}

const ROOT: usize = 0;

impl Default for MockDom {
    fn default() -> Self {
        Self {
            nodes: vec![Node {
                tag: "body".into(),
                attributes: BTreeMap::new(),
                text: String::new(),
                visible: true,
                children: Vec::new(),
                parent: None,
                attached: true,
                select_pending: false,
            }],
        }
    }
}

impl MockDom {
    fn insert(&mut self, element: MockElement, parent: usize) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Node {
            tag: element.tag,
            attributes: element.attributes,
            text: element.text,
            visible: element.visible,
            children: Vec::new(),
            parent: Some(parent),
            attached: true,
            select_pending: false,
        });
        for child in element.children {
            let child_index = self.insert(child, index);
            self.nodes[index].children.push(child_index);
        }
        index
    }

    fn detach(&mut self, index: usize) {
        self.nodes[index].attached = false;
        let children = self.nodes[index].children.clone();
        for child in children {
            self.detach(child);
        }
    }

    fn descendants(&self, index: usize, out: &mut Vec<usize>) {
        for &child in &self.nodes[index].children {
            out.push(child);
            self.descendants(child, out);
        }
    }

    fn find_test_id(&self, test_id: &str) -> Option<usize> {
        let mut all = Vec::new();
        self.descendants(ROOT, &mut all);
        all.into_iter().find(|&i| {
            self.nodes[i].attributes.get(TEST_ID_ATTRIBUTE).map(String::as_str) == Some(test_id)
        })
    }

    fn matches(&self, index: usize, selector: &Selector) -> bool {
        let node = &self.nodes[index];
        let attr = |name: &str| node.attributes.get(name).map(String::as_str);
        match selector {
            Selector::TestId(id) => attr(TEST_ID_ATTRIBUTE) == Some(id.as_str()),
            Selector::InputName(name) => node.tag == "input" && attr("name") == Some(name.as_str()),
            Selector::DomId(id) => attr("id") == Some(id.as_str()),
            Selector::Tag(tag) => node.tag.eq_ignore_ascii_case(tag),
        }
    }

    fn is_displayed(&self, index: usize) -> bool {
        let mut current = Some(index);
        while let Some(i) = current {
            if !self.nodes[i].visible {
                return false;
            }
            current = self.nodes[i].parent;
        }
        true
    }

    fn rendered_text(&self, index: usize) -> String {
        let node = &self.nodes[index];
        let mut parts = Vec::new();
        if !node.text.trim().is_empty() {
            parts.push(node.text.trim().to_string());
        }
        for &child in &node.children {
            if self.nodes[child].visible {
                let text = self.rendered_text(child);
                if !text.is_empty() {
                    parts.push(text);
                }
            }
        }
        parts.join(" ")
    }

    fn live(&self, element: &ElementHandle) -> HarnessResult<usize> {
        let index = element
            .id
            .strip_prefix("mock-")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|&n| n < self.nodes.len())
            .ok_or_else(|| HarnessError::driver(format!("unknown element {}", element.id)))?;
        if self.nodes[index].attached {
            Ok(index)
        } else {
            Err(HarnessError::stale(format!(
                "<{}> {} detached",
                element.tag_name, element.id
            )))
        }
    }

    fn handle(&self, index: usize) -> ElementHandle {
        ElementHandle::new(format!("mock-{index}"), self.nodes[index].tag.clone())
    }

    fn describe(&self, index: usize) -> String {
        let node = &self.nodes[index];
        node.attributes
            .get(TEST_ID_ATTRIBUTE)
            .or_else(|| node.attributes.get("name"))
            .cloned()
            .unwrap_or_else(|| node.tag.clone())
    }

    /// Append an element tree under `<body>`
    pub fn mount(&mut self, element: MockElement) {
        let index = self.insert(element, ROOT);
        self.nodes[ROOT].children.push(index);
    }

    /// Append an element tree under the element with the given test id.
    ///
    /// Returns false when no such element is attached.
    pub fn mount_under(&mut self, parent_test_id: &str, element: MockElement) -> bool {
        let Some(parent) = self.find_test_id(parent_test_id) else {
            return false;
        };
        let index = self.insert(element, parent);
        self.nodes[parent].children.push(index);
        true
    }

    /// Re-render: swap the element with the given test id for a new tree.
    ///
    /// Handles into the old subtree become stale. Returns false when no such
    /// element is attached.
    pub fn replace(&mut self, test_id: &str, element: MockElement) -> bool {
        let Some(old) = self.find_test_id(test_id) else {
            return false;
        };
        let parent = self.nodes[old].parent.unwrap_or(ROOT);
        self.detach(old);
        let new = self.insert(element, parent);
        if let Some(slot) = self.nodes[parent].children.iter_mut().find(|c| **c == old) {
            *slot = new;
        }
        true
    }

    /// Remove the element with the given test id
    pub fn remove(&mut self, test_id: &str) -> bool {
        let Some(old) = self.find_test_id(test_id) else {
            return false;
        };
        let parent = self.nodes[old].parent.unwrap_or(ROOT);
        self.detach(old);
        self.nodes[parent].children.retain(|c| *c != old);
        true
    }

    /// Replace own text of the element with the given test id
    pub fn set_text(&mut self, test_id: &str, text: impl Into<String>) -> bool {
        match self.find_test_id(test_id) {
            Some(index) => {
                self.nodes[index].text = text.into();
                true
            }
            None => false,
        }
    }

    /// Show or hide the element with the given test id
    pub fn set_visible(&mut self, test_id: &str, visible: bool) -> bool {
        match self.find_test_id(test_id) {
            Some(index) => {
                self.nodes[index].visible = visible;
                true
            }
            None => false,
        }
    }

    /// Detach everything under `<body>`
    pub fn clear(&mut self) {
        let children = std::mem::take(&mut self.nodes[ROOT].children);
        for child in children {
            self.detach(child);
        }
    }

    /// Current `value` of the attached input with the given `name`
    #[must_use]
    pub fn input_value(&self, name: &str) -> Option<String> {
        let mut all = Vec::new();
        self.descendants(ROOT, &mut all);
        all.into_iter()
            .find(|&i| self.matches(i, &Selector::InputName(name.to_string())))
            .map(|i| {
                self.nodes[i]
                    .attributes
                    .get("value")
                    .cloned()
                    .unwrap_or_default()
            })
    }
}

// =============================================================================
// DRIVER
// =============================================================================

/// Interaction recorded by the mock driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockAction {
    /// Navigation to a URL
    Navigate(String),
    /// Click on an element (test id, name or tag)
    Click(String),
    /// Keystrokes sent to an element
    Type {
        /// Element description
        target: String,
        /// Text typed
        text: String,
    },
    /// Select-all on an element
    SelectAll(String),
    /// Script evaluation
    Script(String),
    /// Viewport resize
    Resize(u32, u32),
    /// Window maximize
    Maximize,
    /// Session close
    Close,
}

type ClickHook = Box<dyn FnMut(&mut MockDom) + Send>;

/// Driver over an in-memory DOM
#[derive(Default)]
pub struct MockDriver {
    dom: Mutex<MockDom>,
    hooks: Mutex<HashMap<String, ClickHook>>,
    actions: Mutex<Vec<MockAction>>,
    state: Mutex<MockState>,
}

#[derive(Debug, Default)]
struct MockState {
    url: String,
    title: String,
    stale_budget: usize,
    script_results: Vec<serde_json::Value>,
}

impl std::fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDriver")
            .field("dom", &self.dom)
            .field("actions", &self.actions)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> HarnessResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| HarnessError::driver("mock driver lock poisoned"))
}

impl MockDriver {
    /// Create new mock driver with an empty `<body>`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutate the DOM directly
    pub fn with_dom<R>(&self, f: impl FnOnce(&mut MockDom) -> R) -> HarnessResult<R> {
        let mut dom = lock(&self.dom)?;
        Ok(f(&mut dom))
    }

    /// Append an element tree under `<body>`
    pub fn mount(&self, element: MockElement) {
        if let Ok(mut dom) = self.dom.lock() {
            dom.mount(element);
        }
    }

    /// Re-render the element with the given test id
    pub fn replace(&self, test_id: &str, element: MockElement) -> bool {
        self.dom
            .lock()
            .map(|mut dom| dom.replace(test_id, element))
            .unwrap_or(false)
    }

    /// Run `hook` against the DOM every time the element with this test id
    /// is clicked
    pub fn on_click(
        &self,
        test_id: impl Into<String>,
        hook: impl FnMut(&mut MockDom) + Send + 'static,
    ) {
        if let Ok(mut hooks) = self.hooks.lock() {
            hooks.insert(test_id.into(), Box::new(hook));
        }
    }

    /// Make the next `n` element operations fail with a stale reference
    pub fn inject_stale(&self, n: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.stale_budget = n;
        }
    }

    /// Queue a result for the next `execute_script` call
    pub fn push_script_result(&self, value: serde_json::Value) {
        if let Ok(mut state) = self.state.lock() {
            state.script_results.push(value);
        }
    }

    /// Set the document title
    pub fn set_title(&self, title: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.title = title.into();
        }
    }

    /// Last URL navigated to
    #[must_use]
    pub fn current_url(&self) -> String {
        self.state.lock().map(|s| s.url.clone()).unwrap_or_default()
    }

    /// Recorded interactions, oldest first
    #[must_use]
    pub fn actions(&self) -> Vec<MockAction> {
        self.actions.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Value of the input with the given `name`
    #[must_use]
    pub fn input_value(&self, name: &str) -> Option<String> {
        self.dom.lock().ok().and_then(|dom| dom.input_value(name))
    }

    fn record(&self, action: MockAction) -> HarnessResult<()> {
        lock(&self.actions)?.push(action);
        Ok(())
    }

    fn consume_stale(&self, element: &ElementHandle) -> HarnessResult<()> {
        let mut state = lock(&self.state)?;
        if state.stale_budget > 0 {
            state.stale_budget -= 1;
            return Err(HarnessError::stale(format!(
                "<{}> {} re-rendered",
                element.tag_name, element.id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl UiDriver for MockDriver {
    async fn navigate(&self, url: &str) -> HarnessResult<()> {
        lock(&self.state)?.url = url.to_string();
        self.record(MockAction::Navigate(url.to_string()))
    }

    async fn title(&self) -> HarnessResult<String> {
        Ok(lock(&self.state)?.title.clone())
    }

    async fn find_all(
        &self,
        scope: Option<&ElementHandle>,
        selector: &Selector,
    ) -> HarnessResult<Vec<ElementHandle>> {
        let dom = lock(&self.dom)?;
        let root = match scope {
            Some(element) => dom.live(element)?,
            None => ROOT,
        };
        let mut all = Vec::new();
        dom.descendants(root, &mut all);
        Ok(all
            .into_iter()
            .filter(|&i| dom.matches(i, selector))
            .map(|i| dom.handle(i))
            .collect())
    }

    async fn text(&self, element: &ElementHandle) -> HarnessResult<String> {
        self.consume_stale(element)?;
        let dom = lock(&self.dom)?;
        let index = dom.live(element)?;
        if dom.is_displayed(index) {
            Ok(dom.rendered_text(index))
        } else {
            Ok(String::new())
        }
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> HarnessResult<Option<String>> {
        self.consume_stale(element)?;
        let dom = lock(&self.dom)?;
        let index = dom.live(element)?;
        Ok(dom.nodes[index].attributes.get(name).cloned())
    }

    async fn is_displayed(&self, element: &ElementHandle) -> HarnessResult<bool> {
        self.consume_stale(element)?;
        let dom = lock(&self.dom)?;
        let index = dom.live(element)?;
        Ok(dom.is_displayed(index))
    }

    async fn click(&self, element: &ElementHandle) -> HarnessResult<()> {
        self.consume_stale(element)?;
        let mut hooks = lock(&self.hooks)?;
        let mut dom = lock(&self.dom)?;
        let index = dom.live(element)?;
        let target = dom.describe(index);
        let test_id = dom.nodes[index].attributes.get(TEST_ID_ATTRIBUTE).cloned();
        if let Some(id) = test_id {
            if let Some(hook) = hooks.get_mut(&id) {
                hook(&mut *dom);
            }
        }
        drop(dom);
        drop(hooks);
        self.record(MockAction::Click(target))
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> HarnessResult<()> {
        self.consume_stale(element)?;
        let mut dom = lock(&self.dom)?;
        let index = dom.live(element)?;
        let target = dom.describe(index);
        let node = &mut dom.nodes[index];
        let value = node.attributes.entry("value".into()).or_default();
        if node.select_pending {
            value.clear();
        }
        value.push_str(text);
        node.select_pending = false;
        drop(dom);
        self.record(MockAction::Type {
            target,
            text: text.to_string(),
        })
    }

    async fn select_all(&self, element: &ElementHandle) -> HarnessResult<()> {
        self.consume_stale(element)?;
        let mut dom = lock(&self.dom)?;
        let index = dom.live(element)?;
        dom.nodes[index].select_pending = true;
        let target = dom.describe(index);
        drop(dom);
        self.record(MockAction::SelectAll(target))
    }

    async fn execute_script(&self, script: &str) -> HarnessResult<serde_json::Value> {
        self.record(MockAction::Script(script.to_string()))?;
        let mut state = lock(&self.state)?;
        if state.script_results.is_empty() {
            Ok(serde_json::Value::Null)
        } else {
            Ok(state.script_results.remove(0))
        }
    }

    async fn screenshot(&self) -> HarnessResult<Vec<u8>> {
        Ok(MOCK_PNG.to_vec())
    }

    async fn set_window_size(&self, width: u32, height: u32) -> HarnessResult<()> {
        self.record(MockAction::Resize(width, height))
    }

    async fn maximize(&self) -> HarnessResult<()> {
        self.record(MockAction::Maximize)
    }

    async fn close(&self) -> HarnessResult<()> {
        self.record(MockAction::Close)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    mod find_tests {
        use super::*;

        #[tokio::test]
        async fn test_find_by_test_id_and_scope() {
            let driver = MockDriver::new();
            driver.mount(
                MockElement::new("div")
                    .test_id("outer")
                    .child(MockElement::new("span").test_id("inner").text("hi")),
            );
            driver.mount(MockElement::new("span").test_id("inner").text("other"));

            let all = driver
                .find_all(None, &Selector::test_id("inner"))
                .await
                .unwrap();
            assert_eq!(all.len(), 2);

            let outer = driver
                .find_all(None, &Selector::test_id("outer"))
                .await
                .unwrap();
            let scoped = driver
                .find_all(Some(&outer[0]), &Selector::test_id("inner"))
                .await
                .unwrap();
            assert_eq!(scoped.len(), 1);
            assert_eq!(driver.text(&scoped[0]).await.unwrap(), "hi");
        }

        #[tokio::test]
        async fn test_input_name_requires_input_tag() {
            let driver = MockDriver::new();
            driver.mount(MockElement::new("div").name("user"));
            driver.mount(MockElement::new("input").name("user"));
            let found = driver
                .find_all(None, &Selector::InputName("user".into()))
                .await
                .unwrap();
            assert_eq!(found.len(), 1);
            assert!(found[0].is_input());
        }

        #[tokio::test]
        async fn test_table_builder_shape() {
            let driver = MockDriver::new();
            driver.mount(MockElement::table(
                "t",
                &["name", "state"],
                vec![cells(&["a", "Ready"])],
            ));
            let th = driver.find_all(None, &Selector::tag("th")).await.unwrap();
            let td = driver.find_all(None, &Selector::tag("td")).await.unwrap();
            assert_eq!(th.len(), 2);
            assert_eq!(td.len(), 2);
        }
    }

    mod staleness_tests {
        use super::*;

        #[tokio::test]
        async fn test_replace_makes_old_handles_stale() {
            let driver = MockDriver::new();
            driver.mount(MockElement::new("div").test_id("panel").text("v1"));
            let old = driver
                .find_all(None, &Selector::test_id("panel"))
                .await
                .unwrap()
                .remove(0);
            assert!(driver.replace("panel", MockElement::new("div").test_id("panel").text("v2")));

            let err = driver.text(&old).await.unwrap_err();
            assert!(err.is_stale());

            let fresh = driver
                .find_all(None, &Selector::test_id("panel"))
                .await
                .unwrap();
            assert_eq!(fresh.len(), 1);
            assert_eq!(driver.text(&fresh[0]).await.unwrap(), "v2");
        }

        #[tokio::test]
        async fn test_injected_stale_is_consumed() {
            let driver = MockDriver::new();
            driver.mount(MockElement::new("button").test_id("b"));
            let b = driver
                .find_all(None, &Selector::test_id("b"))
                .await
                .unwrap()
                .remove(0);
            driver.inject_stale(1);
            assert!(driver.click(&b).await.unwrap_err().is_stale());
            driver.click(&b).await.unwrap();
        }
    }

    mod interaction_tests {
        use super::*;

        #[tokio::test]
        async fn test_click_hook_mutates_dom() {
            let driver = MockDriver::new();
            driver.mount(MockElement::new("button").test_id("go"));
            driver.on_click("go", |dom| dom.mount(MockElement::new("div").test_id("done")));
            let go = driver
                .find_all(None, &Selector::test_id("go"))
                .await
                .unwrap()
                .remove(0);
            driver.click(&go).await.unwrap();
            let done = driver
                .find_all(None, &Selector::test_id("done"))
                .await
                .unwrap();
            assert_eq!(done.len(), 1);
            assert_eq!(driver.actions(), vec![MockAction::Click("go".into())]);
        }

        #[tokio::test]
        async fn test_select_all_then_type_replaces_value() {
            let driver = MockDriver::new();
            driver.mount(MockElement::new("input").name("name").attr("value", "old"));
            let input = driver
                .find_all(None, &Selector::InputName("name".into()))
                .await
                .unwrap()
                .remove(0);
            driver.send_keys(&input, "-x").await.unwrap();
            assert_eq!(driver.input_value("name").as_deref(), Some("old-x"));
            driver.select_all(&input).await.unwrap();
            driver.send_keys(&input, "new").await.unwrap();
            assert_eq!(driver.input_value("name").as_deref(), Some("new"));
        }

        #[tokio::test]
        async fn test_hidden_text_is_empty() {
            let driver = MockDriver::new();
            driver.mount(MockElement::new("div").test_id("h").text("secret").hidden());
            let h = driver
                .find_all(None, &Selector::test_id("h"))
                .await
                .unwrap()
                .remove(0);
            assert!(!driver.is_displayed(&h).await.unwrap());
            assert_eq!(driver.text(&h).await.unwrap(), "");
        }

        #[tokio::test]
        async fn test_script_results_are_queued() {
            let driver = MockDriver::new();
            driver.push_script_result(serde_json::json!(1));
            assert_eq!(
                driver.execute_script("1").await.unwrap(),
                serde_json::json!(1)
            );
            assert_eq!(
                driver.execute_script("2").await.unwrap(),
                serde_json::Value::Null
            );
        }
    }
}
