//! Deterministic report text for when generated content is unusable.
//!
//! Nothing here calls a model or touches the network: the output depends only
//! on the report type, the birth input and whatever generated sections were
//! good enough to keep. Every section body is a per-heading passage followed
//! by a per-type paragraph, personalised with the reader's first name and
//! birth place.

use astrosetu_core::models::birth::BirthInput;
use astrosetu_core::models::report::{ReportContent, ReportSection, ReportType};
use astrosetu_core::policy::MIN_SECTION_BODY_CHARS;

/// Build complete, outline-shaped content from `generated` without any
/// network call.
///
/// Generated sections whose heading matches the outline and whose body is
/// long enough are kept in outline order; every other outline heading gets
/// template text. Usable generated sections outside the outline follow the
/// outline sections. A blank title or summary is replaced.
pub fn apply_fallback_no_api(
    report_type: ReportType,
    input: &BirthInput,
    generated: &ReportContent,
) -> ReportContent {
    let name = input.first_name();
    let place = input.place.trim();
    let usable: Vec<&ReportSection> = generated.sections.iter().filter(|s| is_usable(s)).collect();

    let mut sections: Vec<ReportSection> = report_type
        .outline()
        .iter()
        .map(|heading| {
            usable
                .iter()
                .find(|s| same_heading(&s.heading, heading))
                .map(|s| (*s).clone())
                .unwrap_or_else(|| {
                    ReportSection::new(*heading, section_body(report_type, heading, name, place))
                })
        })
        .collect();

    sections.extend(
        usable
            .iter()
            .filter(|s| !report_type.outline().iter().any(|h| same_heading(&s.heading, h)))
            .map(|s| (*s).clone()),
    );

    let title = if generated.title.trim().is_empty() {
        format!("{} for {}", report_type.display_name(), input.name.trim())
    } else {
        generated.title.clone()
    };
    let summary = if generated.summary.trim().is_empty() {
        personalise(SUMMARY, name, place).replace("{report}", report_type.display_name())
    } else {
        generated.summary.clone()
    };

    ReportContent {
        title,
        summary,
        sections,
    }
}

fn is_usable(section: &ReportSection) -> bool {
    !section.heading.trim().is_empty()
        && section.body.trim().chars().count() >= MIN_SECTION_BODY_CHARS
}

fn same_heading(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn section_body(report_type: ReportType, heading: &str, name: &str, place: &str) -> String {
    let passage = personalise(heading_passage(heading), name, place);
    let closing = personalise(type_paragraph(report_type), name, place);
    format!("{passage}\n\n{closing}")
}

fn personalise(template: &str, name: &str, place: &str) -> String {
    template.replace("{name}", name).replace("{place}", place)
}

const SUMMARY: &str = "This {report} for {name} draws on the birth details recorded for {place}. \
It describes broad tendencies and periods rather than fixed outcomes, and is best read as a \
companion to reflection rather than a set of instructions.";

const GENERIC_PASSAGE: &str = "This part of the chart is read as a set of tendencies rather than \
certainties, {name}. The patterns described here tend to show most clearly when you look back \
over several years, so it helps to compare them with what you have already lived through.";

fn heading_passage(heading: &str) -> &'static str {
    match heading {
        "Personality & Temperament" | "Personality" => {
            "{name}, your chart points to a temperament that is steady on the surface and more \
             searching underneath. You tend to take in a situation fully before committing to it, \
             and people who know you well often rely on that patience and on the quiet judgement \
             that comes with it."
        }
        "Strengths" => {
            "Your clearest strengths are persistence and an ability to learn from slow, practical \
             experience. When a goal matters to you, {name}, you return to it again and again \
             until it gives way, and that steadiness tends to earn trust from colleagues and \
             family alike."
        }
        "Challenges" => {
            "The main challenge shown is a habit of carrying more than your share and saying \
             little about it. Periods of strain are easier, {name}, when you name what you need \
             early, accept help when it is offered and let go of tasks that were never really \
             yours to hold."
        }
        "Life Themes" => {
            "Two themes recur across your life: building something that lasts, and finding a \
             place where you feel genuinely understood. Many of your important choices, {name}, \
             can be read as attempts to balance security against the wish to grow beyond the \
             familiar."
        }
        "Relationship Outlook" | "Relationships" => {
            "In relationships, {name}, you tend to value loyalty and shared purpose over quick \
             excitement. Bonds deepen slowly for you and then hold firm, and the partnerships \
             that last are usually those in which both people feel free to speak plainly and \
             disagree without fear."
        }
        "Favourable Periods" => {
            "The more favourable periods in your chart arrive when patient effort has already \
             been made and a door simply needs to be walked through. Watch for stretches when \
             commitments feel lighter, {name}, and when invitations come to you without having \
             to be chased."
        }
        "Partner Qualities" => {
            "The partner most suited to you is likely to be dependable, warm and curious about \
             the world, someone who respects your need for time to think. Shared values around \
             family and work matter more here, {name}, than matching tastes or a similar pace \
             of life."
        }
        "Guidance" => {
            "The guidance that follows from this reading is simple: act when a choice feels \
             settled rather than merely urgent, {name}. Keep a small number of trusted people \
             close, review decisions after a few weeks rather than a few hours, and let steady \
             habits carry you."
        }
        "Career Direction" | "Career" => {
            "Your working life, {name}, favours roles that reward depth and reliability over \
             constant change. You are likely to do best where you can master a craft, take on \
             responsibility gradually and see the results of your effort accumulate over a span \
             of several years."
        }
        "Wealth Patterns" | "Finances" => {
            "Money tends to come to you through steady accumulation rather than sudden gains. \
             Careful saving, modest and well-understood investments and avoiding debt taken on \
             in haste, {name}, suit the pattern shown far better than speculation or chasing \
             short-term returns."
        }
        "Health" => {
            "The chart suggests a constitution that responds well to routine, {name}. Regular \
             sleep, unhurried meals and time outdoors are worth protecting, especially in busy \
             seasons, and any persistent concern is always best taken to a qualified medical \
             practitioner promptly."
        }
        "Spiritual Growth" => {
            "Your inner life grows through quiet practice rather than dramatic turning points. \
             Reflection, reading and time spent in places that feel peaceful, {name}, tend to \
             restore you, and your sense of meaning deepens most when you give attention to \
             others as well."
        }
        "Timeline" => {
            "Across the timeline of your life, {name}, the early years emphasise learning and \
             finding your footing, the middle years emphasise building and responsibility, and \
             later years turn towards sharing what you have learned and enjoying what has been \
             patiently built."
        }
        "Year Overview" => {
            "This year is read as one of consolidation for you, {name}. Rather than a single \
             dramatic change, expect a series of smaller adjustments that together leave you on \
             firmer ground, with the clearest progress coming from plans that were already in \
             motion before it began."
        }
        "First Quarter" => {
            "The first quarter favours planning, tidying up unfinished matters and setting \
             realistic intentions, {name}. Energy may feel slow to build at first, so it helps \
             to choose one or two priorities and give them steady attention instead of spreading \
             yourself too thinly."
        }
        "Second Quarter" => {
            "The second quarter brings more movement. Conversations started earlier in the year \
             can turn into concrete offers or decisions, {name}, and this is a good time to \
             follow up, meet people in person and commit to the plans that still feel right on \
             reflection."
        }
        "Third Quarter" => {
            "The third quarter asks for patience. Some matters may stall or need revisiting, \
             {name}, and it is wiser to strengthen what you have already started than to begin \
             something entirely new. Rest and family time are especially well spent during \
             these months."
        }
        "Fourth Quarter" => {
            "The fourth quarter is favourable for completing work, settling accounts and \
             recognising how far you have come, {name}. It is also a natural point to set \
             intentions for the following year, drawing on what the earlier quarters taught you \
             about your own pace."
        }
        "Current Phase" => {
            "You are moving through a phase, {name}, in which long-standing arrangements are \
             being tested and, where they no longer fit, gently loosened. It can feel unsettled \
             at times, yet the chart reads it as preparation for a steadier period rather than \
             as a loss."
        }
        "What This Phase Asks" => {
            "This phase asks you to be honest about what you have outgrown and to make room for \
             what you actually want now, {name}. It rewards small deliberate steps, clear \
             boundaries with your time and a willingness to let some familiar commitments come \
             to a natural end."
        }
        "Opportunities" => {
            "The opportunities of this phase lie in learning, new working relationships and a \
             renewed sense of direction, {name}. Openings are most likely to come through people \
             who already know your work, so staying in touch and saying yes to modest \
             invitations is worthwhile."
        }
        "Decision Context" => {
            "The decision in front of you, {name}, sits at a point where your chart favours \
             careful weighing over speed. The surrounding period supports gathering information \
             and talking with people you trust, and it is not one that punishes taking a little \
             extra time to decide."
        }
        "Favourable Factors" => {
            "Several factors lean in your favour, {name}: a steady base of support, experience \
             that is directly relevant and a period that rewards commitment once it is made. \
             Choices that build on what you already do well are more likely to settle smoothly \
             than sharp departures."
        }
        "Cautions" => {
            "The main cautions are haste and overextension, {name}. Avoid agreeing to terms you \
             have not fully read, be wary of timelines that depend on everything going right, \
             and leave yourself room to change course if early signs suggest the path is not \
             what it seemed."
        }
        _ => GENERIC_PASSAGE,
    }
}

fn type_paragraph(report_type: ReportType) -> &'static str {
    match report_type {
        ReportType::LifeSummary => {
            "Taken as a whole, this life summary describes a person born in {place} whose path \
             is shaped more by steady choices than by chance. The qualities above are most \
             useful, {name}, as a mirror: notice where they ring true, and where they do not, \
             treat that as an invitation to look again."
        }
        ReportType::MarriageTiming => {
            "Questions of marriage and partnership are read here through the broad rhythm of the \
             chart cast for {place}, {name}. Timing in this area is best treated as a season of \
             readiness rather than a fixed date, and the right relationship will still depend on \
             the choices both people make together."
        }
        ReportType::CareerMoney => {
            "Career and money are read together here because, for someone born in {place} with \
             this chart, {name}, the two tend to rise and settle at the same pace. Progress is \
             most reliable when work you respect is paired with patient, well-understood \
             financial habits over many years."
        }
        ReportType::FullLife => {
            "This full life reading brings together every major area of the chart cast for \
             {place}, {name}. The sections are meant to be read side by side: strengths in one \
             area often support weaker ones, and the periods described in the timeline shape \
             how each theme unfolds. Return to it over time, since different parts will feel \
             relevant at different stages of life."
        }
        ReportType::YearAnalysis => {
            "This year analysis follows the chart cast for {place} through the coming twelve \
             months, {name}. The quarters describe emphasis rather than fixed events, so use \
             them to choose when to push forward and when to rest, and revisit the reading as \
             the year unfolds."
        }
        ReportType::MajorLifePhase => {
            "This reading of your current life phase draws on the chart cast for {place}, \
             {name}. Phases like this usually span several years, so the guidance above is \
             meant to be returned to as circumstances change rather than acted on all at once \
             or taken as a single forecast."
        }
        ReportType::DecisionSupport => {
            "This decision support reading draws on the chart cast for {place}, {name}. It \
             cannot make the choice for you, but it can suggest when conditions are supportive \
             and which considerations deserve extra weight, so that whichever path you take is \
             chosen with clear eyes."
        }
    }
}
