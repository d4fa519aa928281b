/// Entity operation selected by the raw request action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Export,
    Get,
    Create,
    Update,
    Delete,
    BulkCreate,
    BulkUpdate,
    BulkDelete,
}

impl Operation {
    /// `None` for actions entity handlers do not serve (`manage`, unknown names).
    #[must_use]
    pub fn parse(action: &str) -> Option<Self> {
        Some(match action {
            "list" => Self::List,
            "export" | "download" => Self::Export,
            "get" | "view" => Self::Get,
            "create" | "insert" => Self::Create,
            "update" | "edit" | "patch" => Self::Update,
            "delete" | "remove" => Self::Delete,
            "bulk_create" => Self::BulkCreate,
            "bulk_update" => Self::BulkUpdate,
            "bulk_delete" => Self::BulkDelete,
            _ => return None,
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crm_security::Action;

    #[test]
    fn operations_agree_with_permission_actions() {
        let cases = [
            ("list", Action::Read),
            ("view", Action::Read),
            ("download", Action::Export),
            ("insert", Action::Create),
            ("patch", Action::Update),
            ("remove", Action::Delete),
            ("bulk_update", Action::Bulk),
        ];
        for (raw, action) in cases {
            assert!(Operation::parse(raw).is_some(), "{raw}");
            assert_eq!(Action::normalize(raw), action, "{raw}");
        }
    }

    #[test]
    fn unsupported_actions() {
        assert_eq!(Operation::parse("manage"), None);
        assert_eq!(Operation::parse("LIST"), None);
    }
}
