use crate::persona::{humanize, title_case};
use crate::types::PersonaRecord;

/// A line inside the Demographics section. `value` returns `None` when the
/// line should be left out.
pub struct DemographicLine {
    pub label: &'static str,
    pub value: fn(&PersonaRecord) -> Option<String>,
}

/// A `## <header>` section of the rendered profile.
pub struct Section {
    pub header: &'static str,
    pub body: fn(&PersonaRecord) -> String,
}

pub const DEMOGRAPHICS: &[DemographicLine] = &[
    DemographicLine {
        label: "Sex",
        value: |p| Some(p.sex.clone()),
    },
    DemographicLine {
        label: "Age",
        value: |p| Some(p.age.clone()),
    },
    DemographicLine {
        label: "Location",
        value: |p| Some(format!("{}, {} {}", p.city, p.state, p.zipcode)),
    },
    DemographicLine {
        label: "Marital Status",
        value: |p| Some(title_case(&humanize(&p.marital_status))),
    },
    DemographicLine {
        label: "Education",
        value: |p| Some(title_case(&humanize(&p.education_level))),
    },
    DemographicLine {
        label: "Field of Study",
        value: |p| {
            p.bachelors_field
                .as_deref()
                .filter(|f| !f.trim().is_empty())
                .map(str::to_uppercase)
        },
    },
    DemographicLine {
        label: "Occupation",
        value: |p| Some(title_case(&humanize(&p.occupation))),
    },
];

/// Profile sections in render order. Narrative bodies are the raw field text.
pub const SECTIONS: &[Section] = &[
    Section {
        header: "Demographics",
        body: render_demographics,
    },
    Section {
        header: "Personality",
        body: |p| p.persona.clone(),
    },
    Section {
        header: "Background",
        body: |p| p.cultural_background.clone(),
    },
    Section {
        header: "Professional Life",
        body: |p| p.professional_persona.clone(),
    },
    Section {
        header: "Skills & Expertise",
        body: |p| p.skills_and_expertise.clone(),
    },
    Section {
        header: "Hobbies & Interests",
        body: |p| p.hobbies_and_interests.clone(),
    },
    Section {
        header: "Life Goals",
        body: |p| p.career_goals_and_ambitions.clone(),
    },
    Section {
        header: "Sports & Fitness",
        body: |p| p.sports_persona.clone(),
    },
    Section {
        header: "Arts & Culture",
        body: |p| p.arts_persona.clone(),
    },
    Section {
        header: "Travel",
        body: |p| p.travel_persona.clone(),
    },
    Section {
        header: "Food & Cooking",
        body: |p| p.culinary_persona.clone(),
    },
];

fn render_demographics(record: &PersonaRecord) -> String {
    DEMOGRAPHICS
        .iter()
        .filter_map(|line| (line.value)(record).map(|v| format!("{}: {}", line.label, v)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a persona into the multi-section character profile used as the
/// assistant response. Sections are separated by a blank line.
pub fn render_profile(record: &PersonaRecord) -> String {
    SECTIONS
        .iter()
        .map(|section| format!("## {}\n{}", section.header, (section.body)(record)))
        .collect::<Vec<_>>()
        .join("\n\n")
}
