use crate::api::{FieldErrors, Role, TeamMember, TeamMemberInput};

/// Inputs of the add and edit forms, in tab order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Field {
    #[default]
    FirstName,
    LastName,
    Phone,
    Email,
    Role,
}

impl Field {
    pub const ALL: [Self; 5] = [Self::FirstName, Self::LastName, Self::Phone, Self::Email, Self::Role];

    /// Name of the field in request bodies and error maps.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Role => "role",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FirstName => "First Name",
            Self::LastName => "Last Name",
            Self::Phone => "Phone",
            Self::Email => "Email",
            Self::Role => "Role",
        }
    }

    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::FirstName => Self::LastName,
            Self::LastName => Self::Phone,
            Self::Phone => Self::Email,
            Self::Email => Self::Role,
            Self::Role => Self::FirstName,
        }
    }

    #[must_use]
    pub const fn prev(self) -> Self {
        match self {
            Self::FirstName => Self::Role,
            Self::LastName => Self::FirstName,
            Self::Phone => Self::LastName,
            Self::Email => Self::Phone,
            Self::Role => Self::Email,
        }
    }
}

/// Editable state of a member form.
///
/// `errors` holds either the client-side validation result or the field
/// errors of the last rejected save, whichever came last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberForm {
    input: TeamMemberInput,
    focus: Field,
    errors: FieldErrors,
    loaded: bool,
}

impl MemberForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A form pre-filled with an existing record.
    #[must_use]
    pub fn from_member(member: &TeamMember) -> Self {
        Self {
            input: member.input(),
            loaded: true,
            ..Self::default()
        }
    }

    /// Whether the form has been filled from a fetched record.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[must_use]
    pub const fn input(&self) -> &TeamMemberInput {
        &self.input
    }

    #[must_use]
    pub const fn focus(&self) -> Field {
        self.focus
    }

    pub const fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub const fn focus_prev(&mut self) {
        self.focus = self.focus.prev();
    }

    /// Text shown for `field`.
    #[must_use]
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::FirstName => &self.input.first_name,
            Field::LastName => &self.input.last_name,
            Field::Phone => &self.input.phone,
            Field::Email => &self.input.email,
            Field::Role => self.input.role.description(),
        }
    }

    const fn text_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::FirstName => Some(&mut self.input.first_name),
            Field::LastName => Some(&mut self.input.last_name),
            Field::Phone => Some(&mut self.input.phone),
            Field::Email => Some(&mut self.input.email),
            Field::Role => None,
        }
    }

    /// Types `c` into the focused field. Space on the role field toggles it;
    /// the phone field only takes digits.
    pub fn insert(&mut self, c: char) {
        match self.focus {
            Field::Role if c == ' ' => self.toggle_role(),
            Field::Phone if !c.is_ascii_digit() => {}
            field => {
                if let Some(text) = self.text_mut(field) {
                    text.push(c);
                }
            }
        }
    }

    pub fn backspace(&mut self) {
        if let Some(text) = self.text_mut(self.focus) {
            text.pop();
        }
    }

    pub const fn toggle_role(&mut self) {
        self.input.role = self.input.role.toggled();
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.input.role
    }

    #[must_use]
    pub const fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// The message shown under `field`, if any.
    #[must_use]
    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.first(field.key())
    }

    pub fn set_errors(&mut self, errors: FieldErrors) {
        self.errors = errors;
    }

    pub fn clear_errors(&mut self) {
        self.errors = FieldErrors::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_cycles_through_all_fields() {
        let mut form = MemberForm::new();
        for field in Field::ALL {
            assert_eq!(form.focus(), field);
            form.focus_next();
        }
        assert_eq!(form.focus(), Field::FirstName);
        form.focus_prev();
        assert_eq!(form.focus(), Field::Role);
    }

    #[test]
    fn test_typing_edits_focused_field() {
        let mut form = MemberForm::new();
        "Ada".chars().for_each(|c| form.insert(c));
        form.backspace();
        assert_eq!(form.input().first_name, "Ad");

        form.focus_next();
        form.focus_next();
        "555-12a3".chars().for_each(|c| form.insert(c));
        assert_eq!(form.input().phone, "555123");
    }

    #[test]
    fn test_role_field_toggles() {
        let mut form = MemberForm::new();
        while form.focus() != Field::Role {
            form.focus_next();
        }
        assert_eq!(form.role(), Role::Regular);
        form.insert(' ');
        assert_eq!(form.role(), Role::Admin);
        form.insert('x');
        form.backspace();
        assert_eq!(form.role(), Role::Admin);
        assert_eq!(form.value(Field::Role), "Admin - Can delete members");
    }

    #[test]
    fn test_errors_by_field() {
        let mut form = MemberForm::new();
        let mut errors = FieldErrors::new();
        errors.push("phone", "Ensure this field has no more than 10 characters.");
        form.set_errors(errors);
        assert_eq!(
            form.error(Field::Phone),
            Some("Ensure this field has no more than 10 characters.")
        );
        assert_eq!(form.error(Field::Email), None);
        form.clear_errors();
        assert!(form.errors().is_empty());
    }
}
