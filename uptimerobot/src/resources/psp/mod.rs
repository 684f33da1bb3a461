//! Public status page resource
//!
//! Writes go through the API and are then polled until a few consecutive
//! reads agree with what was sent, because reads right after a write can be
//! served by a replica that has not caught up. Monitor membership that the
//! API silently dropped is reported as an error; on create the page is
//! rolled back.

pub mod mismatch;
pub mod reconcile;
pub mod schema;
pub mod upgrade;

use crate::api::Psp;
use crate::UptimeRobotProviderData;
use async_trait::async_trait;
use mismatch::{classify_and_report, MismatchReport};
use reconcile::{
    converged, merge_monitor_ids, parse_psp_id, payload_from_plan, project_psp, Operation,
};
use schema::{LAYOUT_VALUES, SORT_VALUES, STATUS_VALUES};
use tfplug::context::Context;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, ResourceWithUpgradeState, UpdateResourceRequest,
    UpdateResourceResponse, UpgradeResourceStateRequest, UpgradeResourceStateResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{
    OneOfValidator, PositiveIntegerElementsValidator, StringLengthValidator,
    StringPatternValidator, Validator,
};
use tfplug::{
    import_state_passthrough_id, mask_state, take_import_marker, wait_until_settled, MaskMode,
    MaskSources,
};

pub const TYPE_NAME: &str = "uptimerobot_psp";

const HEX_COLOUR: &str = r"^#[0-9a-fA-F]{6}$";

#[derive(Default)]
pub struct PspResource {
    provider_data: Option<UptimeRobotProviderData>,
}

impl PspResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn provider_data(&self) -> Result<&UptimeRobotProviderData, Diagnostic> {
        self.provider_data.as_ref().ok_or_else(|| {
            Diagnostic::error(
                "Provider not configured",
                "Provider data was not properly configured",
            )
        })
    }
}

fn create_failed(diagnostics: Vec<Diagnostic>) -> CreateResourceResponse {
    CreateResourceResponse {
        new_state: DynamicValue::null(),
        private: vec![],
        diagnostics,
    }
}

fn invalid_id(error: String) -> Diagnostic {
    Diagnostic::error("Invalid status page id", error).with_attribute(AttributePath::new("id"))
}

fn mismatch_diagnostic(report: &MismatchReport) -> Diagnostic {
    Diagnostic::error(report.summary(), report.detail())
        .with_attribute(AttributePath::new("monitor_ids"))
}

fn set_monitor_ids(state: &mut Dynamic, ids: &[i64]) {
    if let Dynamic::Map(fields) = state {
        fields.insert(
            "monitor_ids".to_string(),
            Dynamic::set(ids.iter().map(|id| Dynamic::Number(*id as f64))),
        );
    }
}

/// Builds the state to persist from the plan (or prior state) and what the
/// server reported
fn reconcile_state(operation: Operation, prior: &Dynamic, planned: &Dynamic, server: &Psp) -> Dynamic {
    let schema = schema::psp_schema();
    let projected = project_psp(server);
    let (mode, planned) = match operation {
        Operation::Create | Operation::Update => (MaskMode::PlanWins, planned),
        Operation::Read => (MaskMode::ServerWins, planned),
        // Nothing was configured yet, adopt everything the server has
        Operation::ReadAfterImport => (MaskMode::ServerWins, &projected),
    };

    let mut state = mask_state(
        &schema.block,
        mode,
        MaskSources {
            prior,
            planned,
            server: &projected,
        },
    );
    let monitor_ids = merge_monitor_ids(
        operation,
        planned.attr("monitor_ids"),
        prior.attr("monitor_ids"),
        projected.attr("monitor_ids"),
    );
    if let Dynamic::Map(fields) = &mut state {
        fields.insert("monitor_ids".to_string(), monitor_ids);
    }
    state
}

/// Polls until the page reports the expected name and monitors. Returns the
/// settled snapshot, or the last one seen with a warning when the budget
/// runs out.
async fn await_settled(
    ctx: &Context,
    data: &UptimeRobotProviderData,
    id: i64,
    name: &str,
    expected_ids: Option<&[i64]>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Psp> {
    let backend = data.backend.as_ref();
    let result = wait_until_settled(
        ctx,
        &data.settle,
        move || backend.get_psp(id),
        |psp: &Psp| converged(psp, name, expected_ids),
    )
    .await;

    match result {
        Ok(settled) => {
            tracing::debug!(id, attempts = settled.attempts, "status page settled");
            Some(settled.snapshot)
        }
        Err(unsettled) => {
            tracing::warn!(id, error = %unsettled.error, "status page did not settle");
            diagnostics.push(Diagnostic::warning(
                "Status page did not settle",
                format!(
                    "Status page {} did not consistently report the requested values: {}. \
                     The last observed values were used.",
                    id, unsettled.error
                ),
            ));
            unsettled.last
        }
    }
}

#[async_trait]
impl Resource for PspResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: schema::psp_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let config = &request.config.value;
        let mut diagnostics = vec![];

        StringLengthValidator {
            min: Some(1),
            max: None,
        }
        .validate(config.attr("name"), &AttributePath::new("name"), &mut diagnostics);
        PositiveIntegerElementsValidator.validate(
            config.attr("monitor_ids"),
            &AttributePath::new("monitor_ids"),
            &mut diagnostics,
        );
        OneOfValidator {
            allowed: &STATUS_VALUES,
        }
        .validate(config.attr("status"), &AttributePath::new("status"), &mut diagnostics);
        OneOfValidator {
            allowed: &SORT_VALUES,
        }
        .validate(config.attr("sort"), &AttributePath::new("sort"), &mut diagnostics);

        let settings = config.attr("custom_settings");
        let settings_path = AttributePath::new("custom_settings");
        OneOfValidator {
            allowed: &LAYOUT_VALUES,
        }
        .validate(
            settings.attr("page").attr("layout"),
            &settings_path.clone().attribute("page").attribute("layout"),
            &mut diagnostics,
        );

        match StringPatternValidator::new(HEX_COLOUR, "a #rrggbb colour") {
            Ok(hex) => {
                for key in ["main", "text", "link"] {
                    hex.validate(
                        settings.attr("colors").attr(key),
                        &settings_path.clone().attribute("colors").attribute(key),
                        &mut diagnostics,
                    );
                }
            }
            Err(e) => diagnostics.push(Diagnostic::error("Colour validation failed", e.to_string())),
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let data = match self.provider_data() {
            Ok(data) => data,
            Err(diag) => return create_failed(vec![diag]),
        };

        let plan = &request.planned_state.value;
        let payload = match payload_from_plan(plan) {
            Ok(payload) => payload,
            Err(e) => {
                return create_failed(vec![Diagnostic::error(
                    "Invalid status page configuration",
                    e,
                )])
            }
        };
        let requested = payload.monitor_ids.value().cloned();
        let name = plan.attr("name").as_str().unwrap_or_default().to_string();

        let created = match data.backend.create_psp(&payload).await {
            Ok(psp) => psp,
            Err(e) => {
                return create_failed(vec![Diagnostic::error(
                    "Failed to create status page",
                    format!("API error: {}", e),
                )])
            }
        };
        tracing::info!(id = created.id, name = %name, "status page created");

        let observed = await_settled(
            &ctx,
            data,
            created.id,
            &name,
            requested.as_deref(),
            &mut diagnostics,
        )
        .await
        .unwrap_or(created);
        let mut state = reconcile_state(Operation::Create, &Dynamic::Null, plan, &observed);

        if let Some(requested) = &requested {
            let applied = observed.monitor_ids.clone().unwrap_or_default();
            let report = classify_and_report(data.backend.as_ref(), requested, &applied).await;
            if report.is_reportable() {
                diagnostics.push(mismatch_diagnostic(&report));
                match data.backend.delete_psp(observed.id).await {
                    Ok(()) => {
                        tracing::info!(id = observed.id, "status page rolled back");
                        return create_failed(diagnostics);
                    }
                    Err(e) if e.is_not_found() => return create_failed(diagnostics),
                    Err(e) => {
                        tracing::warn!(id = observed.id, error = %e, "status page rollback failed");
                        diagnostics.push(Diagnostic::warning(
                            "Failed to roll back status page",
                            format!(
                                "Status page {} was created but could not be deleted: {}. \
                                 It is kept in state so it can be fixed or destroyed.",
                                observed.id, e
                            ),
                        ));
                        set_monitor_ids(&mut state, &applied);
                    }
                }
            }
        }

        CreateResourceResponse {
            new_state: DynamicValue::new(state),
            private: vec![],
            diagnostics,
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let (imported, private) = take_import_marker(&request.private);
        let operation = if imported {
            Operation::ReadAfterImport
        } else {
            Operation::Read
        };

        let data = match self.provider_data() {
            Ok(data) => data,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                    private,
                }
            }
        };

        let current = &request.current_state.value;
        let id = match parse_psp_id(current.attr("id")) {
            Ok(id) => id,
            Err(e) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state.clone()),
                    diagnostics: vec![invalid_id(e)],
                    private,
                }
            }
        };

        match data.backend.get_psp(id).await {
            Ok(psp) => {
                tracing::debug!(id, %operation, "status page read");
                let state = reconcile_state(operation, current, current, &psp);
                ReadResourceResponse {
                    new_state: Some(DynamicValue::new(state)),
                    diagnostics: vec![],
                    private,
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::info!(id, "status page no longer exists, removing from state");
                ReadResourceResponse::removed(private)
            }
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state.clone()),
                diagnostics: vec![Diagnostic::error(
                    "Failed to read status page",
                    format!("API error: {}", e),
                )],
                private,
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        let data = match self.provider_data() {
            Ok(data) => data,
            Err(diag) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        let prior = &request.prior_state.value;
        let plan = &request.planned_state.value;
        let prepared = parse_psp_id(prior.attr("id"))
            .map_err(invalid_id)
            .and_then(|id| {
                payload_from_plan(plan)
                    .map(|payload| (id, payload))
                    .map_err(|e| Diagnostic::error("Invalid status page configuration", e))
            });
        let (id, payload) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state.clone(),
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };
        let requested = payload.monitor_ids.value().cloned();
        let name = plan.attr("name").as_str().unwrap_or_default().to_string();

        let updated = match data.backend.update_psp(id, &payload).await {
            Ok(psp) => psp,
            Err(e) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state.clone(),
                    private: vec![],
                    diagnostics: vec![Diagnostic::error(
                        "Failed to update status page",
                        format!("API error: {}", e),
                    )],
                }
            }
        };
        tracing::info!(id, "status page updated");

        let observed = await_settled(&ctx, data, id, &name, requested.as_deref(), &mut diagnostics)
            .await
            .unwrap_or(updated);
        let mut state = reconcile_state(Operation::Update, prior, plan, &observed);

        if let Some(requested) = &requested {
            let applied = observed.monitor_ids.clone().unwrap_or_default();
            let report = classify_and_report(data.backend.as_ref(), requested, &applied).await;
            if report.is_reportable() {
                diagnostics.push(mismatch_diagnostic(&report));
                // Persist what is really attached so the next plan shows the gap
                set_monitor_ids(&mut state, &applied);
            }
        }

        UpdateResourceResponse {
            new_state: DynamicValue::new(state),
            private: vec![],
            diagnostics,
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let data = match self.provider_data() {
            Ok(data) => data,
            Err(diag) => {
                return DeleteResourceResponse {
                    diagnostics: vec![diag],
                }
            }
        };

        let id = match parse_psp_id(request.prior_state.value.attr("id")) {
            Ok(id) => id,
            Err(e) => {
                return DeleteResourceResponse {
                    diagnostics: vec![invalid_id(e)],
                }
            }
        };

        match data.backend.delete_psp(id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!(id, "status page already gone");
                return DeleteResourceResponse {
                    diagnostics: vec![],
                };
            }
            Err(e) => {
                return DeleteResourceResponse {
                    diagnostics: vec![Diagnostic::error(
                        "Failed to delete status page",
                        format!("API error: {}", e),
                    )],
                }
            }
        }

        let backend = data.backend.as_ref();
        let confirmed = wait_until_settled(
            &ctx,
            &data.settle,
            move || async move {
                match backend.get_psp(id).await {
                    Ok(_) => Ok(false),
                    Err(e) if e.is_not_found() => Ok(true),
                    Err(e) => Err(e),
                }
            },
            |gone: &bool| *gone,
        )
        .await;

        let mut diagnostics = vec![];
        match confirmed {
            Ok(_) => tracing::info!(id, "status page deleted"),
            Err(unsettled) => {
                tracing::warn!(id, error = %unsettled.error, "status page deletion not confirmed");
                diagnostics.push(Diagnostic::error(
                    "Status page deletion not confirmed",
                    format!(
                        "Status page {} was still reported by the API after deletion: {}",
                        id, unsettled.error
                    ),
                ));
            }
        }
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for PspResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<UptimeRobotProviderData>() {
                self.provider_data = Some(provider_data.clone());
            } else {
                diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract UptimeRobotProviderData from provider data",
                ));
            }
        } else {
            diagnostics.push(Diagnostic::error(
                "No provider data",
                "No provider data was provided to the resource",
            ));
        }

        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for PspResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };

        if let Err(e) = parse_psp_id(&Dynamic::string(request.id.as_str())) {
            response.diagnostics.push(Diagnostic::error(
                "Invalid import ID",
                format!("Expected the numeric id of a status page: {}", e),
            ));
            return response;
        }

        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);
        response
    }
}

#[async_trait]
impl ResourceWithUpgradeState for PspResource {
    async fn upgrade_state(
        &self,
        _ctx: Context,
        request: UpgradeResourceStateRequest,
    ) -> UpgradeResourceStateResponse {
        upgrade::psp_upgrader().respond(&request)
    }
}
