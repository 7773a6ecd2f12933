//! Built-in sequences for the Jotform workspace UI.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::types::{SequenceDocument, Step};
use crate::{SequenceCatalog, custom_stub};

/// Catalog key for the form creation flow.
pub const FORM_CREATION: &str = "form_creation";
/// Catalog key for the form building flow.
pub const FORM_BUILDING: &str = "form_building";

/// The compiled-in catalog.
#[derive(Clone, Debug)]
pub struct BuiltinCatalog {
    documents: BTreeMap<&'static str, SequenceDocument>,
}

impl BuiltinCatalog {
    /// Build the catalog.
    pub fn new() -> Self {
        let mut documents = BTreeMap::new();
        let _ = documents.insert(FORM_CREATION, form_creation());
        let _ = documents.insert(FORM_BUILDING, form_building());
        Self { documents }
    }
}

impl Default for BuiltinCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceCatalog for BuiltinCatalog {
    fn resolve(&self, sequence_type: &str, parameters: &Map<String, Value>) -> SequenceDocument {
        // Built-in documents ignore parameters.
        match self.documents.get(sequence_type) {
            Some(doc) => doc.clone(),
            None => {
                debug!(
                    sequence_type,
                    parameter_count = parameters.len(),
                    "no built-in sequence, returning stub"
                );
                custom_stub(sequence_type)
            }
        }
    }

    fn known_types(&self) -> Vec<String> {
        self.documents.keys().map(|k| (*k).to_owned()).collect()
    }
}

/// Create a new classic form from the workspace.
fn form_creation() -> SequenceDocument {
    SequenceDocument {
        sequence_id: "form-creation-v1".into(),
        name: "Create New Form".into(),
        steps: vec![
            Step::navigate(
                "https://www.jotform.com/myforms",
                "Navigate to Jotform workspace",
                2000,
            ),
            Step::click(
                "#root > div.lsApp > div.lsApp-body.newWorkspaceUI.newTeamCoversActive > div.lsApp-sidebar.relative > div.lsApp-sidebar-content.lsApp-sidebar-ls > div.lsApp-sidebar-button > button",
                "Click Create button",
                1000,
            ),
            Step::click(
                "#create-asset-modal-container > div > div.sc-khQegj.fNgvag.forSideBySideCreation.jfWizard-item.jfWizard-gutter.withMaxWidth > div > div > div.jfWizard-body.sc-hUpaCq.gxAShf > div > ul > li:nth-child(1) > button",
                "Click Form button",
                1000,
            ),
            Step::click(
                "#modal-container > div > div.isMain.largeWizardItem.moreThanFourItem.jfWizard-item > div.jfWizard-gutter.withMaxWidth > div > ul > li.jfWizard-list-item-wrapper.forStartFromScratch > button",
                "Click Start from scratch",
                1000,
            ),
            Step::click(
                "#modal-container > div > div.largeWizardItem.isStartFromScratch.forNewOptions.jfWizard-item > div.jfWizard-gutter.withMaxWidth > div > ul > li.jfWizard-list-item-wrapper.forClassicForm > button",
                "Click Classic form",
                500,
            ),
            Step::click(
                "#portal-root > div > div > div > div > div > div.jfModal-header > div.jfModal-title > div.jfModal-close",
                "Close modal dialog",
                1000,
            ),
        ],
    }
}

/// Set the heading of a freshly created form.
fn form_building() -> SequenceDocument {
    SequenceDocument {
        sequence_id: "form-building-v1".into(),
        name: "Build Form Elements".into(),
        steps: vec![
            Step::wait("Wait for page to initialize", 1000),
            Step::click(
                "#id_1 > div.question-wrapper.questionWrapper > div > div",
                "Click on heading form element",
                1000,
            ),
            Step::click(
                r"#app_wizards > div > button.btn.sc-Properties.radius-full.magnet-button.inline-flex.shrink-0.justify-center.items-center.font-medium.duration-300.outline-2.outline-transparent.outline-offset-0.focus\:outline-opacity-50.h-10.px-2\.5.border-0.group.cursor-pointer.color-white.bg-gray-600.hover\:bg-gray-700.focus\:outline-gray-300",
                "Click settings button",
                1000,
            ),
            Step::type_text("#text", "Course Registration", "Enter form title text", 500),
            Step::click("#question-settings-close-btn", "Close settings menu", 500),
        ],
    }
}
