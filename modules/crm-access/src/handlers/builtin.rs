use crm_db::OwnershipFields;
use crm_security::policy::modules;

use crate::domain::store::EntityTable;
use crate::handlers::descriptor::EntityDescriptor;

fn scoped(owner: &str) -> OwnershipFields {
    OwnershipFields::new(owner)
        .with_team("team_id")
        .with_country("country_code")
}

/// Descriptors for the built-in CRM modules.
#[must_use]
pub fn builtin_descriptors() -> Vec<EntityDescriptor> {
    vec![
        EntityDescriptor::new(
            modules::PROPERTIES,
            EntityTable::new("properties", "id"),
            scoped("agent_id"),
        )
        .filterable(&[
            "status",
            "property_type",
            "listing_type",
            "city",
            "price",
            "bedrooms",
            "bathrooms",
            "featured",
            "project_id",
        ])
        .sortable(&["price", "title", "bedrooms", "updated_at"])
        .searchable(&["title", "description", "address", "city"]),
        EntityDescriptor::new(
            modules::CONTACTS,
            EntityTable::new("contacts", "id"),
            scoped("assigned_to"),
        )
        .filterable(&["status", "source", "contact_type", "city"])
        .sortable(&["first_name", "last_name", "email", "updated_at"])
        .searchable(&["first_name", "last_name", "email", "phone"]),
        EntityDescriptor::new(
            modules::DEALS,
            EntityTable::new("deals", "id"),
            scoped("agent_id"),
        )
        .filterable(&[
            "stage",
            "status",
            "amount",
            "property_id",
            "contact_id",
            "expected_close_date",
        ])
        .sortable(&["amount", "expected_close_date", "updated_at"])
        .searchable(&["title", "notes"]),
        EntityDescriptor::new(
            modules::LEADS,
            EntityTable::new("leads", "id"),
            scoped("assigned_to"),
        )
        .filterable(&["status", "source", "score", "budget_min", "budget_max"])
        .sortable(&["score", "updated_at"])
        .searchable(&["name", "email", "phone"]),
        // Activities carry no team; team scope falls back to ownership.
        EntityDescriptor::new(
            modules::ACTIVITIES,
            EntityTable::new("activities", "id"),
            OwnershipFields::new("user_id").with_country("country_code"),
        )
        .filterable(&["activity_type", "related_type", "related_id", "completed"])
        .sortable(&["scheduled_at"])
        .searchable(&["subject", "notes"]),
        EntityDescriptor::new(
            modules::TASKS,
            EntityTable::new("tasks", "id"),
            scoped("assigned_to"),
        )
        .filterable(&["status", "priority", "due_date", "related_id"])
        .sortable(&["due_date", "priority"])
        .searchable(&["title", "description"]),
        EntityDescriptor::new(
            modules::DOCUMENTS,
            EntityTable::new("documents", "id"),
            scoped("uploaded_by"),
        )
        .filterable(&["document_type", "related_type", "related_id"])
        .sortable(&["name", "size_bytes"])
        .searchable(&["name"]),
        EntityDescriptor::new(
            modules::PROJECTS,
            EntityTable::new("projects", "id"),
            scoped("manager_id"),
        )
        .filterable(&["status", "city", "developer"])
        .sortable(&["name", "delivery_date"])
        .searchable(&["name", "description", "developer"]),
        // A team row is "in" the team it describes.
        EntityDescriptor::new(
            modules::TEAMS,
            EntityTable::new("teams", "id"),
            OwnershipFields::new("leader_id")
                .with_team("id")
                .with_country("country_code"),
        )
        .filterable(&["name"])
        .sortable(&["name"])
        .searchable(&["name"]),
        // Users own their own row.
        EntityDescriptor::new(modules::USERS, EntityTable::new("users", "id"), scoped("id"))
            .filterable(&["role", "is_active"])
            .sortable(&["email", "full_name", "last_login_at"])
            .searchable(&["email", "full_name"]),
        EntityDescriptor::new(
            modules::REPORTS,
            EntityTable::new("reports", "id"),
            scoped("created_by"),
        )
        .filterable(&["report_type"])
        .sortable(&["name"])
        .searchable(&["name"]),
        EntityDescriptor::new(
            modules::CONFIG,
            EntityTable::new("system_config", "key"),
            OwnershipFields::unrestricted(),
        )
        .filterable(&["category"])
        .sortable(&["category"])
        .searchable(&["key", "description"]),
    ]
}
