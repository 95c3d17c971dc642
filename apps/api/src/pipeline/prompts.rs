// All LLM prompt constants for the candidate-evaluation pipeline.
// Reuses cross-cutting fragments from llm_client::prompts.
//
// Each stage's system prompt is `<ROLE> <JSON_ONLY_SYSTEM>`; the role sentence is
// unique per stage.

/// Role framing for the extraction stage.
pub const EXTRACTION_ROLE: &str =
    "You are a meticulous resume parser that converts raw resume text into structured candidate facts.";

/// Extraction prompt template. Replace: {no_fabrication}, {confidence_instruction}, {resume_text}
pub const EXTRACTION_PROMPT_TEMPLATE: &str = r#"{no_fabrication}

Extract the candidate's facts from the resume below.

Return a JSON object with this EXACT schema:
{
  "name": "Jane Doe",
  "email": "jane@example.com",
  "phone": "+1 555 010 9999",
  "location": "Berlin, Germany",
  "experience": [
    {
      "title": "Senior Frontend Engineer",
      "company": "Acme",
      "start_date": "2019-03",
      "end_date": "present",
      "description": "Led the React migration of the billing dashboard"
    }
  ],
  "years_of_experience": 5.5,
  "skills": ["React", "TypeScript"],
  "education_level": "Bachelor",
  "extraction_confidence": 0.9
}

Rules:
- Dates as YYYY-MM when the month is known, YYYY otherwise, "present" for current roles
- education_level: one of "High School", "Associate", "Bachelor", "Master", "PhD", or null
- skills: concrete technologies, tools, and methods named in the resume, as written
- {confidence_instruction}

RESUME:
{resume_text}"#;

/// Role framing for the analysis stage.
pub const ANALYSIS_ROLE: &str =
    "You are a senior technical recruiter comparing a candidate profile with a job description.";

/// Analysis prompt template. Replace: {confidence_instruction}, {extraction_json}, {jd_text}, {checklist_text}
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Compare the candidate with the job requirements.

CANDIDATE PROFILE (extracted from the resume, treat as ground truth):
{extraction_json}

JOB DESCRIPTION:
{jd_text}

JD CHECKLIST:
{checklist_text}

Return a JSON object with this EXACT schema:
{
  "matched_skills": ["React"],
  "inferred_skills": ["JavaScript"],
  "additional_skills": ["Figma"],
  "strengths": ["Five years shipping production React"],
  "weaknesses": ["No backend experience"],
  "recommendation": "recommended",
  "summary": "One or two sentences on overall fit",
  "confidence": 0.8
}

Rules:
- matched_skills: required skills the candidate explicitly lists
- inferred_skills: required skills strongly implied by listed skills or experience (e.g. Redux implies React)
- additional_skills: candidate skills the JD does not ask for
- recommendation: one of "strongly recommended", "recommended", "consider", "not recommended"
- {confidence_instruction}"#;

/// Role framing for the scoring stage.
pub const SCORING_ROLE: &str =
    "You are a calibrated hiring evaluator who scores candidates on fixed dimensions.";

/// Scoring prompt template.
/// Replace: {confidence_instruction}, {extraction_json}, {analysis_json}, {weights_json}, {checklist_summary}
pub const SCORING_PROMPT_TEMPLATE: &str = r#"Score the candidate on each dimension from 0 to 100.

CANDIDATE PROFILE:
{extraction_json}

ANALYSIS:
{analysis_json}

JD CATEGORY WEIGHTS:
{weights_json}

DETERMINISTIC CHECKLIST RESULT:
{checklist_summary}

Dimensions and their weight in the overall score:
- skill (40%): coverage of required skills
- experience (25%): relevance and length of experience
- education (15%): fit of education level
- cultural_fit (10%): collaboration, communication, ownership signals
- additional_value (10%): useful skills beyond the requirements

Return a JSON object with this EXACT schema:
{
  "score_breakdown": {
    "skill": 80,
    "experience": 70,
    "education": 60,
    "cultural_fit": 75,
    "additional_value": 50
  },
  "rationale": "Short justification of the scores",
  "confidence": 0.8
}

Rules:
- Do NOT return an overall score; it is computed from the breakdown
- {confidence_instruction}"#;

/// Role framing for the recommendation stage.
pub const RECOMMENDATION_ROLE: &str =
    "You are a hiring advisor preparing interview plans for shortlisted candidates.";

/// Recommendation prompt template.
/// Replace: {confidence_instruction}, {extraction_json}, {analysis_json}, {scoring_json}, {jd_text}
pub const RECOMMENDATION_PROMPT_TEMPLATE: &str = r#"Prepare the next steps for this candidate.

CANDIDATE PROFILE:
{extraction_json}

ANALYSIS:
{analysis_json}

SCORES:
{scoring_json}

JOB DESCRIPTION:
{jd_text}

Return a JSON object with this EXACT schema:
{
  "recommendation": "recommended",
  "interview_questions": ["Walk me through the React migration you led at Acme"],
  "next_steps": ["Schedule a technical interview"],
  "hiring_manager_note": "Two or three sentences for the hiring manager",
  "confidence": 0.8
}

Rules:
- 3 to 6 interview_questions, each probing a weakness or verifying a claimed strength
- recommendation: one of "strongly recommended", "recommended", "consider", "not recommended"
- {confidence_instruction}"#;
