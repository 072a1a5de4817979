//! Filter-expression building for the upstream query language.
//!
//! The API accepts an OData-ish filter string (`field eq 'value'`,
//! `modified_date gt '…'`, clauses joined with ` and `). Building that
//! string from structured criteria is pure and has no pagination concerns —
//! the result is passed through to each page fetch as an opaque expression.

/// Structured search criteria, compiled with [`SearchCriteria::build`].
#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
  pub email:           Option<String>,
  pub phone:           Option<String>,
  pub given_name:      Option<String>,
  pub family_name:     Option<String>,
  pub postal_code:     Option<String>,
  pub identifier:      Option<String>,
  /// `modified_date lt` bound, ISO-8601.
  pub modified_before: Option<String>,
  /// `modified_date gt` bound, ISO-8601.
  pub modified_after:  Option<String>,
  /// A caller-supplied raw clause, merged as `(built) and (custom)`.
  pub custom:          Option<String>,
}

impl SearchCriteria {
  /// Criteria matching records modified after `timestamp`.
  pub fn modified_after(timestamp: impl Into<String>) -> Self {
    Self {
      modified_after: Some(timestamp.into()),
      ..Self::default()
    }
  }

  /// Compile to a filter expression, or `None` when no criteria are set.
  pub fn build(&self) -> Option<String> {
    let mut clauses = Vec::new();
    let eq_fields = [
      ("email_address", &self.email),
      ("phone_number", &self.phone),
      ("given_name", &self.given_name),
      ("family_name", &self.family_name),
      ("postal_code", &self.postal_code),
      ("identifiers", &self.identifier),
    ];
    for (field, value) in eq_fields {
      if let Some(v) = value {
        clauses.push(format!("{field} eq '{v}'"));
      }
    }
    if let Some(before) = &self.modified_before {
      clauses.push(format!("modified_date lt '{before}'"));
    }
    if let Some(after) = &self.modified_after {
      clauses.push(format!("modified_date gt '{after}'"));
    }

    let built = if clauses.is_empty() {
      None
    } else {
      Some(clauses.join(" and "))
    };

    match (built, &self.custom) {
      (Some(b), Some(c)) => Some(format!("({b}) and ({c})")),
      (Some(b), None) => Some(b),
      (None, Some(c)) => Some(c.clone()),
      (None, None) => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_criteria_build_nothing() {
    assert_eq!(SearchCriteria::default().build(), None);
  }

  #[test]
  fn single_clause() {
    let criteria = SearchCriteria {
      email: Some("a@example.org".to_string()),
      ..SearchCriteria::default()
    };
    assert_eq!(
      criteria.build().as_deref(),
      Some("email_address eq 'a@example.org'")
    );
  }

  #[test]
  fn clauses_join_with_and_in_declaration_order() {
    let criteria = SearchCriteria {
      given_name: Some("Rosa".to_string()),
      family_name: Some("Parks".to_string()),
      ..SearchCriteria::default()
    };
    assert_eq!(
      criteria.build().as_deref(),
      Some("given_name eq 'Rosa' and family_name eq 'Parks'")
    );
  }

  #[test]
  fn modified_window_uses_lt_and_gt() {
    let criteria = SearchCriteria {
      modified_before: Some("2025-08-01T00:00:00Z".to_string()),
      modified_after: Some("2025-07-01T00:00:00Z".to_string()),
      ..SearchCriteria::default()
    };
    assert_eq!(
      criteria.build().as_deref(),
      Some(
        "modified_date lt '2025-08-01T00:00:00Z' and \
         modified_date gt '2025-07-01T00:00:00Z'"
      )
    );
  }

  #[test]
  fn custom_clause_merges_parenthesised() {
    let criteria = SearchCriteria {
      postal_code: Some("13850".to_string()),
      custom: Some("created_date gt '2024-01-01'".to_string()),
      ..SearchCriteria::default()
    };
    assert_eq!(
      criteria.build().as_deref(),
      Some("(postal_code eq '13850') and (created_date gt '2024-01-01')")
    );
  }

  #[test]
  fn custom_clause_alone_passes_through() {
    let criteria = SearchCriteria {
      custom: Some("raw expr".to_string()),
      ..SearchCriteria::default()
    };
    assert_eq!(criteria.build().as_deref(), Some("raw expr"));
  }
}
