//! Serde roundtrip and JsonSchema validation tests for entity and response types.

use std::collections::BTreeSet;

use audix_core::activity::{Activity, ActivityEntry};
use audix_core::entities::*;
use audix_core::enums::*;
use audix_core::progress::Progress;
use audix_core::responses::*;
use chrono::Utc;
use schemars::schema_for;

/// Validate a JSON value against a schemars-generated schema.
fn validate_against_schema(
    schema: &serde_json::Value,
    instance: &serde_json::Value,
) -> Vec<String> {
    let validator = jsonschema::validator_for(schema).expect("schema should be valid");
    validator
        .iter_errors(instance)
        .map(|e| format!("{e}"))
        .collect()
}

macro_rules! roundtrip_and_validate {
    ($name:ident, $ty:ty, $instance:expr) => {
        #[test]
        fn $name() {
            let val: $ty = $instance;

            let json_str = serde_json::to_string_pretty(&val).unwrap();
            let recovered: $ty = serde_json::from_str(&json_str).unwrap();
            assert_eq!(
                recovered,
                val,
                "serde roundtrip failed for {}",
                stringify!($ty)
            );

            let schema = serde_json::to_value(schema_for!($ty)).unwrap();
            let instance = serde_json::to_value(&val).unwrap();
            let errors = validate_against_schema(&schema, &instance);
            assert!(
                errors.is_empty(),
                "Schema validation failed for {}: {:?}",
                stringify!($ty),
                errors
            );
        }
    };
}

fn fields() -> TemplateFields {
    TemplateFields {
        name: "Warehouse safety".into(),
        description: Some("Annual walkthrough".into()),
        content: "1. Fire exits\n2. Ladders".into(),
        tags: BTreeSet::from(["safety".to_string(), "ops".to_string()]),
        status: TemplateStatus::Active,
    }
}

fn item() -> ChecklistItem {
    ChecklistItem {
        id: "itm-0a1b2c3d4e5f".into(),
        checklist_id: "chk-0a1b2c3d4e5f".into(),
        title: "Inspect fire exits".into(),
        description: None,
        is_completed: true,
        is_mandatory: true,
        order: 2,
        depends_on_id: Some("itm-ffffffffffff".into()),
        completed_by: Some("alice".into()),
        completed_at: Some(Utc::now()),
        due_date: None,
        created_at: Utc::now(),
    }
}

roundtrip_and_validate!(
    template_roundtrip,
    AuditTemplate,
    AuditTemplate {
        id: "tpl-0a1b2c3d4e5f".into(),
        fields: fields(),
        version: 3,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
);

roundtrip_and_validate!(
    template_version_roundtrip,
    TemplateVersion,
    TemplateVersion {
        template_id: "tpl-0a1b2c3d4e5f".into(),
        version: 1,
        fields: fields(),
        changed_by: "alice".into(),
        created_at: Utc::now(),
    }
);

roundtrip_and_validate!(
    comment_roundtrip,
    TemplateComment,
    TemplateComment {
        id: "cmt-0a1b2c3d4e5f".into(),
        template_id: "tpl-0a1b2c3d4e5f".into(),
        author: "bob".into(),
        content: "Add a section on ladders".into(),
        created_at: Utc::now(),
    }
);

roundtrip_and_validate!(
    attachment_roundtrip,
    Attachment,
    Attachment {
        id: "att-0a1b2c3d4e5f".into(),
        owner: OwnerRef::report("rpt-0a1b2c3d4e5f"),
        filename: "att-0a1b2c3d4e5f.pdf".into(),
        original_filename: "floor plan.pdf".into(),
        blob_key: "blobs/abc".into(),
        file_size: 2048,
        mime_type: "application/pdf".into(),
        uploaded_by: "carol".into(),
        created_at: Utc::now(),
    }
);

roundtrip_and_validate!(
    report_roundtrip,
    AuditReport,
    AuditReport {
        id: "rpt-0a1b2c3d4e5f".into(),
        template_id: "tpl-0a1b2c3d4e5f".into(),
        template_version: 2,
        title: "Q1 walkthrough".into(),
        generated_by: "alice".into(),
        due_date: Some(Utc::now()),
        created_at: Utc::now(),
    }
);

roundtrip_and_validate!(
    checklist_roundtrip,
    Checklist,
    Checklist {
        id: "chk-0a1b2c3d4e5f".into(),
        owner: Some(OwnerRef::template("tpl-0a1b2c3d4e5f")),
        name: "Walkthrough".into(),
        description: None,
        created_by: "alice".into(),
        revision: 4,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        items: vec![item()],
    }
);

roundtrip_and_validate!(
    activity_entry_roundtrip,
    ActivityEntry,
    ActivityEntry {
        id: "act-0a1b2c3d4e5f".into(),
        actor: "alice".into(),
        activity: Activity::AttachmentAdded {
            owner: OwnerRef::template("tpl-0a1b2c3d4e5f"),
            attachment_id: "att-0a1b2c3d4e5f".into(),
            original_filename: "plan.pdf".into(),
            file_size: 10,
        },
        created_at: Utc::now(),
    }
);

roundtrip_and_validate!(
    item_mutation_roundtrip,
    ItemMutationResponse,
    ItemMutationResponse {
        item: item(),
        checklist_revision: 2,
        progress: Progress::compute("chk-0a1b2c3d4e5f", &[item()]),
    }
);

roundtrip_and_validate!(
    dashboard_roundtrip,
    DashboardStats,
    DashboardStats {
        overview: DashboardOverview {
            total_templates: 3,
            total_reports: 1,
            total_comments: 4,
            total_attachments: 2,
            recent_templates_30d: 3,
            recent_reports_30d: 1,
            total_storage_bytes: 1_572_864,
            total_storage_mb: 1.5,
        },
        templates_by_status: StatusCounts {
            draft: 1,
            active: 2,
            archived: 0,
        },
        trends: DashboardTrends {
            templates_per_month: vec![MonthlyCount {
                year: 2026,
                month: 3,
                count: 3,
                label: "2026-03".into(),
            }],
            reports_per_month: vec![],
        },
        top_templates: TopTemplates {
            most_commented: vec![TemplateCount {
                id: "tpl-0a1b2c3d4e5f".into(),
                name: "Warehouse safety".into(),
                count: 4,
            }],
            most_attachments: vec![],
        },
    }
);

#[test]
fn template_serializes_flat() {
    let template = AuditTemplate {
        id: "tpl-0a1b2c3d4e5f".into(),
        fields: fields(),
        version: 1,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let json = serde_json::to_value(&template).unwrap();
    assert_eq!(json["name"], "Warehouse safety");
    assert_eq!(json["status"], "active");
    assert_eq!(json["tags"], serde_json::json!(["ops", "safety"]));
    assert!(json.get("fields").is_none());
}
