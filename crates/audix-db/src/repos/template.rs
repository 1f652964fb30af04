//! Template repository: live records plus their version ledger.
//!
//! Every successful create, update and restore appends exactly one snapshot
//! in the same unit of work that bumps `audit_templates.version`, so the live
//! record always equals its highest version.

use audix_core::activity::Activity;
use audix_core::entities::{AuditTemplate, OwnerRef, TemplateFields};
use audix_core::enums::{EntityType, TemplateStatus};
use audix_core::ids::PREFIX_TEMPLATE;
use audix_core::responses::RestoreResponse;

use crate::error::DatabaseError;
use crate::guard::{check_version, compare_and_bump};
use crate::helpers::{
    format_datetime, get_opt_string, get_u32, parse_datetime, parse_enum, parse_tags,
    tags_to_json,
};
use crate::service::AudixService;
use crate::updates::template::TemplateUpdate;

const SELECT_COLS: &str =
    "id, name, description, content, tags, status, version, created_at, updated_at";

fn row_to_template(row: &libsql::Row) -> Result<AuditTemplate, DatabaseError> {
    Ok(AuditTemplate {
        id: row.get(0)?,
        fields: TemplateFields {
            name: row.get(1)?,
            description: get_opt_string(row, 2)?,
            content: row.get(3)?,
            tags: parse_tags(&row.get::<String>(4)?)?,
            status: parse_enum(&row.get::<String>(5)?)?,
        },
        version: get_u32(row, 6)?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
        updated_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

fn validate_fields(fields: &TemplateFields) -> Result<(), DatabaseError> {
    if fields.name.trim().is_empty() {
        return Err(DatabaseError::validation("template name must not be empty"));
    }
    if fields.content.trim().is_empty() {
        return Err(DatabaseError::validation("template content must not be empty"));
    }
    Ok(())
}

impl AudixService {
    pub(crate) async fn fetch_template(&self, id: &str) -> Result<AuditTemplate, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM audit_templates WHERE id = ?1"),
                [id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => row_to_template(&row),
            None => Err(DatabaseError::not_found(EntityType::Template, id)),
        }
    }

    pub(crate) async fn ensure_template_exists(&self, id: &str) -> Result<(), DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query("SELECT 1 FROM audit_templates WHERE id = ?1", [id])
            .await?;
        if rows.next().await?.is_none() {
            return Err(DatabaseError::not_found(EntityType::Template, id));
        }
        Ok(())
    }

    /// Fail unless no template other than `except_id` uses `name`.
    async fn ensure_name_available(
        &self,
        name: &str,
        except_id: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT id FROM audit_templates WHERE name = ?1 AND id != ?2",
                libsql::params![name, except_id.unwrap_or("")],
            )
            .await?;
        if rows.next().await?.is_some() {
            return Err(DatabaseError::validation(
                "template with this name already exists",
            ));
        }
        Ok(())
    }

    async fn write_template_fields(
        &self,
        id: &str,
        fields: &TemplateFields,
    ) -> Result<(), DatabaseError> {
        self.db()
            .conn()
            .execute(
                "UPDATE audit_templates
                 SET name = ?1, description = ?2, content = ?3, tags = ?4, status = ?5
                 WHERE id = ?6",
                libsql::params![
                    fields.name.as_str(),
                    fields.description.as_deref(),
                    fields.content.as_str(),
                    tags_to_json(&fields.tags)?,
                    fields.status.as_str(),
                    id
                ],
            )
            .await?;
        Ok(())
    }

    /// Create a template and record it as version 1.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty name or content, or a name already in use.
    pub async fn create_template(
        &self,
        fields: TemplateFields,
        actor: &str,
    ) -> Result<AuditTemplate, DatabaseError> {
        validate_fields(&fields)?;
        let unit = self.begin().await?;
        let result = self.insert_template(fields, actor).await;
        let template = unit.finish(result).await?;
        tracing::info!(template_id = %template.id, actor, "template created");
        Ok(template)
    }

    async fn insert_template(
        &self,
        fields: TemplateFields,
        actor: &str,
    ) -> Result<AuditTemplate, DatabaseError> {
        self.ensure_name_available(&fields.name, None).await?;
        let id = self.db().generate_id(PREFIX_TEMPLATE).await?;
        let now = self.now();

        self.db()
            .conn()
            .execute(
                &format!(
                    "INSERT INTO audit_templates ({SELECT_COLS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7)"
                ),
                libsql::params![
                    id.as_str(),
                    fields.name.as_str(),
                    fields.description.as_deref(),
                    fields.content.as_str(),
                    tags_to_json(&fields.tags)?,
                    fields.status.as_str(),
                    format_datetime(&now)
                ],
            )
            .await?;

        let snapshot = self.append_version(&id, &fields, actor, now).await?;
        if snapshot.version != 1 {
            return Err(DatabaseError::InvalidState(format!(
                "new template {id} already has {} versions",
                snapshot.version - 1
            )));
        }

        self.record_activity(
            actor,
            Activity::TemplateCreated {
                template_id: id.clone(),
                name: fields.name.clone(),
                status: fields.status,
            },
            now,
        )
        .await?;

        Ok(AuditTemplate {
            id,
            fields,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// # Errors
    ///
    /// Returns `NotFound` if the template does not exist.
    pub async fn get_template(&self, id: &str) -> Result<AuditTemplate, DatabaseError> {
        let _read = self.read().await?;
        self.fetch_template(id).await
    }

    /// List live templates, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_templates(
        &self,
        skip: u32,
        limit: Option<u32>,
        status: Option<TemplateStatus>,
    ) -> Result<Vec<AuditTemplate>, DatabaseError> {
        let limit = self.limits().resolve(limit);
        let _read = self.read().await?;

        let mut rows = match status {
            Some(status) => {
                self.db()
                    .conn()
                    .query(
                        &format!(
                            "SELECT {SELECT_COLS} FROM audit_templates WHERE status = ?1
                             ORDER BY updated_at DESC, id DESC LIMIT ?2 OFFSET ?3"
                        ),
                        libsql::params![status.as_str(), i64::from(limit), i64::from(skip)],
                    )
                    .await?
            }
            None => {
                self.db()
                    .conn()
                    .query(
                        &format!(
                            "SELECT {SELECT_COLS} FROM audit_templates
                             ORDER BY updated_at DESC, id DESC LIMIT ?1 OFFSET ?2"
                        ),
                        libsql::params![i64::from(limit), i64::from(skip)],
                    )
                    .await?
            }
        };

        let mut templates = Vec::new();
        while let Some(row) = rows.next().await? {
            templates.push(row_to_template(&row)?);
        }
        Ok(templates)
    }

    /// Apply `update` if the caller saw `expected_version`, appending a new version.
    ///
    /// An update that supplies no fields only performs the version check and
    /// returns the live record unchanged.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the template does not exist.
    /// - `Conflict` if `expected_version` is stale.
    /// - `Validation` if the merged fields are invalid or the new name is taken.
    pub async fn update_template(
        &self,
        id: &str,
        expected_version: u32,
        update: TemplateUpdate,
        actor: &str,
    ) -> Result<AuditTemplate, DatabaseError> {
        let unit = self.begin().await?;
        let result = self
            .apply_template_update(id, expected_version, &update, actor)
            .await;
        let template = unit.finish(result).await?;
        tracing::info!(
            template_id = id,
            version = template.version,
            fields = ?update.changed_fields(),
            "template updated"
        );
        Ok(template)
    }

    async fn apply_template_update(
        &self,
        id: &str,
        expected_version: u32,
        update: &TemplateUpdate,
        actor: &str,
    ) -> Result<AuditTemplate, DatabaseError> {
        let current = self.fetch_template(id).await?;
        check_version(EntityType::Template, id, expected_version, current.version)?;
        if update.is_empty() {
            return Ok(current);
        }

        let merged = update.apply(&current.fields);
        validate_fields(&merged)?;
        if merged.name != current.fields.name {
            self.ensure_name_available(&merged.name, Some(id)).await?;
        }

        let now = self.now();
        let version = compare_and_bump(
            self.db().conn(),
            EntityType::Template,
            "version",
            id,
            expected_version,
            &format_datetime(&now),
        )
        .await?;
        self.write_template_fields(id, &merged).await?;
        self.append_checked_version(id, version, &merged, actor, now)
            .await?;

        self.record_activity(
            actor,
            Activity::TemplateUpdated {
                template_id: id.to_string(),
                version,
                changed_fields: update.changed_fields(),
            },
            now,
        )
        .await?;

        Ok(AuditTemplate {
            id: id.to_string(),
            fields: merged,
            version,
            created_at: current.created_at,
            updated_at: now,
        })
    }

    /// Append the snapshot for a counter value the caller just bumped to.
    async fn append_checked_version(
        &self,
        id: &str,
        version: u32,
        fields: &TemplateFields,
        actor: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), DatabaseError> {
        let snapshot = self.append_version(id, fields, actor, now).await?;
        if snapshot.version != version {
            return Err(DatabaseError::InvalidState(format!(
                "template {id} is at version {version} but its ledger reached {}",
                snapshot.version
            )));
        }
        Ok(())
    }

    /// Make the content of `target_version` current again, as a new version.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the template or the target version does not exist.
    /// - `Conflict` if `expected_version` is supplied and stale.
    /// - `Validation` if the target's name has since been taken by another template.
    pub async fn restore_template(
        &self,
        id: &str,
        target_version: u32,
        expected_version: Option<u32>,
        actor: &str,
    ) -> Result<RestoreResponse, DatabaseError> {
        let unit = self.begin().await?;
        let result = self
            .apply_restore(id, target_version, expected_version, actor)
            .await;
        let response = unit.finish(result).await?;
        tracing::info!(
            template_id = id,
            restored_from = target_version,
            version = response.current_version,
            "template version restored"
        );
        Ok(response)
    }

    async fn apply_restore(
        &self,
        id: &str,
        target_version: u32,
        expected_version: Option<u32>,
        actor: &str,
    ) -> Result<RestoreResponse, DatabaseError> {
        let current = self.fetch_template(id).await?;
        if let Some(expected) = expected_version {
            check_version(EntityType::Template, id, expected, current.version)?;
        }
        let target = self.fetch_version(id, target_version).await?;
        if target.fields.name != current.fields.name {
            self.ensure_name_available(&target.fields.name, Some(id))
                .await?;
        }

        let now = self.now();
        let version = compare_and_bump(
            self.db().conn(),
            EntityType::Template,
            "version",
            id,
            current.version,
            &format_datetime(&now),
        )
        .await?;
        self.write_template_fields(id, &target.fields).await?;
        self.append_checked_version(id, version, &target.fields, actor, now)
            .await?;

        self.record_activity(
            actor,
            Activity::VersionRestored {
                template_id: id.to_string(),
                restored_from: target_version,
                new_version: version,
            },
            now,
        )
        .await?;

        Ok(RestoreResponse {
            message: format!("Restored version {target_version} as version {version}"),
            restored_from: target_version,
            current_version: version,
            template: AuditTemplate {
                id: id.to_string(),
                fields: target.fields,
                version,
                created_at: current.created_at,
                updated_at: now,
            },
        })
    }

    /// Delete the live record. Version history is kept; comments, template
    /// attachments and template checklists are released.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the template does not exist.
    pub async fn delete_template(&self, id: &str, actor: &str) -> Result<(), DatabaseError> {
        let unit = self.begin().await?;
        let result = self.remove_template(id, actor).await;
        let released = unit.finish(result).await?;
        tracing::info!(template_id = id, attachments = released.len(), "template deleted");
        self.release_blobs(released).await;
        Ok(())
    }

    /// Returns the blob keys of the attachments removed with the template.
    async fn remove_template(&self, id: &str, actor: &str) -> Result<Vec<String>, DatabaseError> {
        let current = self.fetch_template(id).await?;
        let owner = OwnerRef::template(id);
        let released = self.remove_owner_attachments(&owner).await?;

        self.db()
            .conn()
            .execute("DELETE FROM checklists WHERE template_id = ?1", [id])
            .await?;
        self.db()
            .conn()
            .execute("DELETE FROM template_comments WHERE template_id = ?1", [id])
            .await?;
        self.db()
            .conn()
            .execute("DELETE FROM audit_templates WHERE id = ?1", [id])
            .await?;

        self.record_activity(
            actor,
            Activity::TemplateDeleted {
                template_id: id.to_string(),
                name: current.fields.name,
            },
            self.now(),
        )
        .await?;
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use audix_core::errors::CoreError;
    use pretty_assertions::assert_eq;

    use crate::test_support::helpers::test_service;
    use crate::updates::template::TemplateUpdateBuilder;

    use super::*;

    fn fields(name: &str, content: &str) -> TemplateFields {
        TemplateFields::new(name, content)
    }

    #[tokio::test]
    async fn create_writes_version_one() {
        let svc = test_service().await;
        let mut f = fields("SOC 2", "controls");
        f.tags.insert("security".into());
        let tpl = svc.create_template(f.clone(), "alice").await.unwrap();

        assert!(audix_core::ids::has_prefix(&tpl.id, PREFIX_TEMPLATE));
        assert_eq!(tpl.version, 1);
        assert_eq!(tpl.fields, f);

        let v1 = svc.get_version(&tpl.id, 1).await.unwrap();
        assert_eq!(v1.fields, f);
        assert_eq!(v1.changed_by, "alice");
        assert_eq!(svc.get_template(&tpl.id).await.unwrap(), tpl);
    }

    #[tokio::test]
    async fn create_rejects_blank_and_duplicate_names() {
        let svc = test_service().await;
        let err = svc
            .create_template(fields("  ", "c"), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::Validation(_))));

        let err = svc
            .create_template(fields("T", ""), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::Validation(_))));

        svc.create_template(fields("T", "c"), "alice").await.unwrap();
        let err = svc
            .create_template(fields("T", "other"), "bob")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn update_appends_and_merges() {
        let svc = test_service().await;
        let tpl = svc.create_template(fields("T", "v1"), "alice").await.unwrap();

        let update = TemplateUpdateBuilder::new()
            .content("v2")
            .status(TemplateStatus::Active)
            .build();
        let updated = svc.update_template(&tpl.id, 1, update, "bob").await.unwrap();

        assert_eq!(updated.version, 2);
        assert_eq!(updated.fields.name, "T");
        assert_eq!(updated.fields.content, "v2");
        assert!(updated.updated_at > tpl.updated_at);

        let v2 = svc.get_version(&tpl.id, 2).await.unwrap();
        assert_eq!(v2.fields, updated.fields);
        assert_eq!(v2.changed_by, "bob");
        assert_eq!(svc.get_version(&tpl.id, 1).await.unwrap().fields.content, "v1");
    }

    #[tokio::test]
    async fn stale_update_conflicts_without_new_version() {
        let svc = test_service().await;
        let tpl = svc.create_template(fields("T", "v1"), "alice").await.unwrap();
        svc.update_template(&tpl.id, 1, TemplateUpdateBuilder::new().content("v2").build(), "a")
            .await
            .unwrap();

        let err = svc
            .update_template(&tpl.id, 1, TemplateUpdateBuilder::new().content("v3").build(), "b")
            .await
            .unwrap_err();
        match err {
            DatabaseError::Core(CoreError::Conflict {
                expected, actual, ..
            }) => {
                assert_eq!((expected, actual), (1, 2));
            }
            other => panic!("expected conflict, got {other}"),
        }
        let versions = svc.list_versions(&tpl.id, None, None).await.unwrap();
        assert_eq!(versions.len(), 2);
    }

    #[tokio::test]
    async fn empty_update_only_checks_version() {
        let svc = test_service().await;
        let tpl = svc.create_template(fields("T", "v1"), "alice").await.unwrap();

        let same = svc
            .update_template(&tpl.id, 1, TemplateUpdate::default(), "alice")
            .await
            .unwrap();
        assert_eq!(same, tpl);

        let err = svc
            .update_template(&tpl.id, 7, TemplateUpdate::default(), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::Conflict { .. })));
        assert_eq!(svc.list_versions(&tpl.id, None, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_missing_template_is_not_found() {
        let svc = test_service().await;
        let err = svc
            .update_template("tpl-00000000dead", 1, TemplateUpdate::default(), "a")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn rename_to_taken_name_is_rejected() {
        let svc = test_service().await;
        svc.create_template(fields("A", "a"), "alice").await.unwrap();
        let b = svc.create_template(fields("B", "b"), "alice").await.unwrap();

        let err = svc
            .update_template(&b.id, 1, TemplateUpdateBuilder::new().name("A").build(), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn restore_appends_copy_of_target() {
        let svc = test_service().await;
        let tpl = svc.create_template(fields("T", "v1"), "alice").await.unwrap();
        svc.update_template(&tpl.id, 1, TemplateUpdateBuilder::new().content("v2").build(), "a")
            .await
            .unwrap();

        let restored = svc.restore_template(&tpl.id, 1, None, "carol").await.unwrap();
        assert_eq!(restored.current_version, 3);
        assert_eq!(restored.restored_from, 1);
        assert_eq!(restored.template.fields.content, "v1");

        let v3 = svc.get_version(&tpl.id, 3).await.unwrap();
        assert_eq!(v3.fields, svc.get_version(&tpl.id, 1).await.unwrap().fields);
        assert_eq!(v3.changed_by, "carol");
    }

    #[tokio::test]
    async fn restore_checks_target_and_expected_version() {
        let svc = test_service().await;
        let tpl = svc.create_template(fields("T", "v1"), "alice").await.unwrap();

        let err = svc.restore_template(&tpl.id, 9, None, "a").await.unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::NotFound { .. })));

        let err = svc
            .restore_template(&tpl.id, 1, Some(4), "a")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::Conflict { .. })));
        assert_eq!(svc.get_template(&tpl.id).await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn delete_keeps_history() {
        let svc = test_service().await;
        let tpl = svc.create_template(fields("T", "v1"), "alice").await.unwrap();
        svc.add_comment(&tpl.id, "note", "bob").await.unwrap();

        svc.delete_template(&tpl.id, "alice").await.unwrap();

        let err = svc.get_template(&tpl.id).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::NotFound { .. })));
        assert_eq!(svc.get_version(&tpl.id, 1).await.unwrap().fields.content, "v1");

        let err = svc.delete_template(&tpl.id, "alice").await.unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::NotFound { .. })));

        // The name is free again.
        svc.create_template(fields("T", "again"), "alice").await.unwrap();
    }

    #[tokio::test]
    async fn list_filters_and_pages() {
        let svc = test_service().await;
        for name in ["a", "b", "c"] {
            svc.create_template(fields(name, "x"), "alice").await.unwrap();
        }
        let mut active = fields("d", "x");
        active.status = TemplateStatus::Active;
        svc.create_template(active, "alice").await.unwrap();

        let all = svc.list_templates(0, None, None).await.unwrap();
        assert_eq!(
            all.iter().map(|t| t.fields.name.as_str()).collect::<Vec<_>>(),
            vec!["d", "c", "b", "a"]
        );

        let page = svc.list_templates(1, Some(2), None).await.unwrap();
        assert_eq!(
            page.iter().map(|t| t.fields.name.as_str()).collect::<Vec<_>>(),
            vec!["c", "b"]
        );

        let only_active = svc
            .list_templates(0, None, Some(TemplateStatus::Active))
            .await
            .unwrap();
        assert_eq!(only_active.len(), 1);
        assert_eq!(only_active[0].fields.name, "d");
    }
}
