// SPDX-FileCopyrightText: The friendly-dist-manager authors
// SPDX-License-Identifier: MPL-2.0

//! Core-metadata documents
//!
//! Renders the `METADATA` document shipped inside built distributions as
//! a sequence of `Key: value` lines. Name and version are mandatory, every
//! other field is optional and omitted when unset.

use itertools::Itertools as _;

use crate::version::SpecifierSet;

/// The metadata schema version written by this crate.
pub const METADATA_VERSION: &str = "2.2";

/// A person associated with the distribution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    /// Display name, if known.
    pub name: Option<String>,

    /// Contact email address, if known.
    pub email: Option<String>,
}

impl Contact {
    fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|email| !email.is_empty())
    }
}

/// A labelled support URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectUrl {
    /// Optional label shown alongside the URL.
    pub label: Option<String>,

    /// The URL itself.
    pub url: String,
}

/// A requirement only pulled in when the named extra is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraRequirement {
    /// The extra this requirement belongs to.
    pub extra: String,

    /// The dependency identifier.
    pub requirement: String,
}

/// A core-metadata document for one distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreMetadata {
    name: String,
    version: String,

    /// Short description of the distribution.
    pub summary: Option<String>,

    /// URL of the project homepage.
    pub homepage: Option<String>,

    /// Licensing terms.
    pub license: Option<String>,

    /// URL where the distribution can be downloaded.
    pub download_url: Option<String>,

    /// Authors of the project.
    pub authors: Vec<Contact>,

    /// Maintainers of the project.
    pub maintainers: Vec<Contact>,

    /// Search terms.
    pub keywords: Vec<String>,

    /// Trove-style classifiers.
    pub classifiers: Vec<String>,

    /// Distributions this one depends on at runtime.
    pub requirements: Vec<String>,

    /// Supported interpreter version ranges.
    pub python_requirements: Vec<SpecifierSet>,

    /// Support URLs.
    pub project_urls: Vec<ProjectUrl>,

    /// Requirements gated behind named extras.
    pub extra_requirements: Vec<ExtraRequirement>,
}

impl CoreMetadata {
    /// Create a document for the given distribution.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            summary: None,
            homepage: None,
            license: None,
            download_url: None,
            authors: Vec::new(),
            maintainers: Vec::new(),
            keywords: Vec::new(),
            classifiers: Vec::new(),
            requirements: Vec::new(),
            python_requirements: Vec::new(),
            project_urls: Vec::new(),
            extra_requirements: Vec::new(),
        }
    }

    /// Name of the distribution being described.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version of the distribution being described.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Render the document.
    #[must_use]
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("Metadata-Version: {METADATA_VERSION}"));
        lines.push(format!("Name: {}", self.name));
        lines.push(format!("Version: {}", self.version));

        encode_contacts(&mut lines, &self.authors, "Author", "Author-email");
        encode_contacts(
            &mut lines,
            &self.maintainers,
            "Maintainer",
            "Maintainer-email",
        );
        encode_value(&mut lines, "Summary", self.summary.as_deref());
        encode_value(&mut lines, "Home-page", self.homepage.as_deref());
        encode_value(&mut lines, "License", self.license.as_deref());
        let keywords = self.keywords.join(",");
        encode_value(&mut lines, "Keywords", Some(&keywords));
        encode_value(&mut lines, "Download-url", self.download_url.as_deref());

        for project_url in &self.project_urls {
            let url_text = match project_url.label.as_deref() {
                Some(label) if !label.is_empty() => {
                    format!("{label}, {url}", url = project_url.url)
                }
                _ => project_url.url.clone(),
            };
            lines.push(format!("Project-URL: {url_text}"));
        }
        for classifier in &self.classifiers {
            lines.push(format!("Classifier: {classifier}"));
        }
        for python_requirement in &self.python_requirements {
            lines.push(format!("Requires-Python: {python_requirement}"));
        }
        // One Provides-Extra per distinct label, in first-appearance order.
        for extra in self
            .extra_requirements
            .iter()
            .map(|extra| extra.extra.as_str())
            .unique()
        {
            lines.push(format!("Provides-Extra: {extra}"));
        }
        for extra in &self.extra_requirements {
            lines.push(format!(
                "Requires-Dist: {requirement}; extra == '{extra}'",
                requirement = extra.requirement,
                extra = extra.extra,
            ));
        }
        for requirement in &self.requirements {
            lines.push(format!("Requires-Dist: {requirement}"));
        }

        lines.join("\n")
    }
}

fn encode_value(lines: &mut Vec<String>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        if !value.is_empty() {
            lines.push(format!("{key}: {value}"));
        }
    }
}

// The Author/Maintainer field holds contact information for a single person,
// so the first contact with a name wins. Emails collect from every contact,
// as `"Name" <email>` when a name is present and as the bare address
// otherwise, separated by commas.
fn encode_contacts(lines: &mut Vec<String>, contacts: &[Contact], name_key: &str, email_key: &str) {
    if let Some(name) = contacts.iter().find_map(Contact::name) {
        lines.push(format!("{name_key}: {name}"));
    }
    let emails = contacts
        .iter()
        .filter_map(|contact| {
            let email = contact.email()?;
            Some(match contact.name() {
                Some(name) => format!("\"{name}\" <{email}>"),
                None => email.to_owned(),
            })
        })
        .join(",");
    if !emails.is_empty() {
        lines.push(format!("{email_key}: {emails}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document_has_only_required_fields() {
        let document = CoreMetadata::new("MyPackage", "1.2.3dev");
        assert_eq!("MyPackage", document.name());
        assert_eq!("1.2.3dev", document.version());
        let rendered = document.render();
        assert_eq!(
            "Metadata-Version: 2.2\nName: MyPackage\nVersion: 1.2.3dev",
            rendered
        );
    }

    #[test]
    fn author_email_only() {
        let mut document = CoreMetadata::new("MyPackage", "1.2.3");
        document.authors.push(Contact {
            name: None,
            email: Some("jdoe@company.com".to_owned()),
        });
        let rendered = document.render();
        assert!(!rendered.contains("Author:"));
        assert!(rendered.contains("Author-email: jdoe@company.com"));
    }

    #[test]
    fn author_name_only() {
        let mut document = CoreMetadata::new("MyPackage", "1.2.3");
        document.authors.push(Contact {
            name: Some("John Doe".to_owned()),
            email: None,
        });
        let rendered = document.render();
        assert!(rendered.contains("Author: John Doe"));
        assert!(!rendered.contains("Author-email:"));
    }

    #[test]
    fn author_name_and_email() {
        let mut document = CoreMetadata::new("MyPackage", "1.2.3");
        document.authors.push(Contact {
            name: Some("John Doe".to_owned()),
            email: Some("jdoe@company.com".to_owned()),
        });
        let rendered = document.render();
        assert!(rendered.contains("Author: John Doe"));
        assert!(rendered.contains("Author-email: \"John Doe\" <jdoe@company.com>"));
    }

    #[test]
    fn first_named_author_wins_and_emails_accumulate() {
        let mut document = CoreMetadata::new("MyPackage", "1.2.3");
        document.authors.push(Contact {
            name: None,
            email: Some("anon@company.com".to_owned()),
        });
        document.authors.push(Contact {
            name: Some("Jane Doe".to_owned()),
            email: Some("jane@company.com".to_owned()),
        });
        let rendered = document.render();
        assert!(rendered.contains("Author: Jane Doe"));
        assert!(
            rendered.contains("Author-email: anon@company.com,\"Jane Doe\" <jane@company.com>")
        );
    }

    #[test]
    fn optional_fields_render_in_order() {
        let mut document = CoreMetadata::new("MyPackage", "1.2.3");
        document.summary = Some("A sample".to_owned());
        document.homepage = Some("https://example.com".to_owned());
        document.license = Some("MIT".to_owned());
        document.keywords = vec!["alpha".to_owned(), "beta".to_owned()];
        document.classifiers = vec!["Programming Language :: Python :: 3".to_owned()];
        document.python_requirements = vec![">=3.5, <4".parse().unwrap()];
        document.requirements = vec!["toml".to_owned()];
        document.project_urls = vec![
            ProjectUrl {
                label: Some("Tracker".to_owned()),
                url: "https://example.com/issues".to_owned(),
            },
            ProjectUrl {
                label: None,
                url: "https://example.com/docs".to_owned(),
            },
        ];
        document.extra_requirements = vec![
            ExtraRequirement {
                extra: "dev".to_owned(),
                requirement: "pytest".to_owned(),
            },
            ExtraRequirement {
                extra: "dev".to_owned(),
                requirement: "pylint".to_owned(),
            },
        ];

        let rendered = document.render();
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(
            vec![
                "Metadata-Version: 2.2",
                "Name: MyPackage",
                "Version: 1.2.3",
                "Summary: A sample",
                "Home-page: https://example.com",
                "License: MIT",
                "Keywords: alpha,beta",
                "Project-URL: Tracker, https://example.com/issues",
                "Project-URL: https://example.com/docs",
                "Classifier: Programming Language :: Python :: 3",
                "Requires-Python: >=3.5, <4",
                "Provides-Extra: dev",
                "Requires-Dist: pytest; extra == 'dev'",
                "Requires-Dist: pylint; extra == 'dev'",
                "Requires-Dist: toml",
            ],
            lines
        );
    }

    #[test]
    fn empty_contact_strings_are_treated_as_unset() {
        let mut document = CoreMetadata::new("MyPackage", "1.2.3");
        document.authors.push(Contact {
            name: Some(String::new()),
            email: Some(String::new()),
        });
        let rendered = document.render();
        assert!(!rendered.contains("Author"));
    }
}
