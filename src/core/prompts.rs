// src/core/prompts.rs — Prompt templates (minijinja)
//
// Every prompt the pipeline sends lives here as a named template, so the
// stages stay free of string assembly and the wording can be reviewed in
// one place.

use minijinja::{context, Environment};
use std::sync::OnceLock;

use super::types::{ObjectSpec, SceneDescription};

static ENV: OnceLock<Environment<'static>> = OnceLock::new();

fn env() -> &'static Environment<'static> {
    ENV.get_or_init(|| {
        let mut env = Environment::new();
        env.add_template("rewrite", REWRITE).expect("template: rewrite");
        env.add_template("decompose", DECOMPOSE).expect("template: decompose");
        env.add_template("synthesize", SYNTHESIZE).expect("template: synthesize");
        env.add_template("correct", CORRECT).expect("template: correct");
        env.add_template("optimize", OPTIMIZE).expect("template: optimize");
        env.add_template("consolidate", CONSOLIDATE).expect("template: consolidate");
        env.add_template("compose", COMPOSE).expect("template: compose");
        env.add_template("material_map", MATERIAL_MAP).expect("template: material_map");
        env.add_template("material_apply", MATERIAL_APPLY).expect("template: material_apply");
        env
    })
}

fn render(name: &str, ctx: minijinja::Value) -> String {
    // Templates are compiled at startup from static strings; a render
    // failure here is a programming error, not a runtime condition.
    env()
        .get_template(name)
        .and_then(|t| t.render(ctx))
        .unwrap_or_else(|e| panic!("render {name}: {e}"))
}

const REWRITE: &str = r#"You are a 3D scene description specialist. Rewrite the user's request into a concrete, structured scene description.

Rules:
- Preserve every explicit dimension, count, and constraint the user gave.
- Resolve vague or metaphorical language into concrete visual features.
- Mark details you inferred with "(inferred)".
- Describe each distinct object, its rough size, and its spatial relation to the others.

User request:
{{ request }}"#;

const DECOMPOSE: &str = r#"Decompose the scene below into a JSON scene description. Respond with JSON only.

Original request:
{{ raw }}

Structured description:
{{ structured }}

Output schema (example):
{
  "scene_name": "cozy_study",
  "scene_context": "a small study room at dusk, warm light",
  "objects": [
    {
      "object_type": "desk",
      "position": "against the back wall, centered",
      "description": "rectangular wooden desk with four legs",
      "components": [
        {"name": "top", "quantity": 1, "shape": "cuboid", "dimensions": {"length": 1.2, "width": 0.6, "height": 0.04}},
        {"name": "leg", "quantity": 4, "shape": "cylinder", "dimensions": {"radius": 0.03, "height": 0.72}}
      ]
    }
  ]
}

Infer reasonable defaults for anything the description leaves out. Every quantity must be at least 1."#;

const SYNTHESIZE: &str = r#"Write a Python script for the host 3D editor that builds the object below from primitive meshes. The script must be self-contained and runnable as-is.

Scene context: {{ scene_context }}

Object: {{ object_type }}
Description: {{ description }}
{% if components %}Components:
{% for c in components %}- {{ c.quantity }}x {{ c.name }} ({{ c.shape }}){% if c.dimensions %} dims: {{ c.dimensions }}{% endif %}
{% endfor %}{% endif %}
Reference documentation:
{{ docs }}

Requirements:
- Build the object at the world origin; placement happens later.
- Name the top-level object "{{ object_type }}".
- Use only the scripting API shown in the reference documentation.
- Respond with code only, no explanation."#;

const CORRECT: &str = r#"The script you produced for this request failed to execute.

Original request:
{{ original_prompt }}

Failing code:
```python
{{ code }}
```

Execution error:
{{ error }}

Return a corrected version of the full script. Respond with code only."#;

const OPTIMIZE: &str = r#"Improve the existing script for the object below according to the reviewer suggestions. Keep everything that already works; change only what the suggestions require.

Object: {{ object_type }}
Description: {{ description }}

Current code:
```python
{{ code }}
```

Priority suggestions:
{% for s in suggestions %}- {{ s }}
{% endfor %}
Reference documentation:
{{ docs }}

Respond with the full revised script, code only."#;

const CONSOLIDATE: &str = r#"You are consolidating reviewer suggestions for a procedural 3D model. Respond with JSON only.

Suggestions:
{% for s in suggestions %}- {{ s }}
{% endfor %}
Current code:
```python
{{ code }}
```

Rules:
- Ignore material, texture, and color suggestions: this stage only targets coarse geometric fidelity.
- Merge suggestions that address the same underlying fix into one entry.
- Drop duplicates.
- "priority_suggestions": fixes for wrong/missing/broken geometry.
- "secondary_suggestions": refinements that can wait.

Output schema:
{"priority_suggestions": ["..."], "secondary_suggestions": ["..."]}"#;

const COMPOSE: &str = r#"Write a Python script that arranges the already-created objects of this scene.

Scene: {{ scene_name }}
Context: {{ scene_context }}

Objects and their placement hints:
{% for o in objects %}- "{{ o.object_type }}": {{ o.position }}
{% endfor %}
Requirements:
- Move and rotate existing objects by name; do not create or delete anything.
- Objects must not interpenetrate; keep plausible clearances.
- Keep everything on or above the ground plane.
- Respond with code only."#;

const MATERIAL_MAP: &str = r#"Assign one material category to every object in this scene. Respond with JSON only.

Scene context: {{ scene_context }}

Objects currently in the scene:
{% for o in records %}- {{ o.name }} ({{ o.object_type }})
{% endfor %}
Allowed categories: wood, metal, glass, plastic, fabric, stone, ceramic, rubber, emissive.

Output schema:
{"materials": {"object_name": "category"}}"#;

const MATERIAL_APPLY: &str = r#"Write a Python script that creates and assigns materials for the objects below.

Material assignment:
{% for m in mappings %}- "{{ m.object }}": {{ m.category }}
{% endfor %}
Reference documentation:
{{ docs }}

Only set these material parameters: base color, metallic, roughness, transmission, emission strength. Do not touch geometry. Respond with code only."#;

pub fn rewrite(request: &str) -> String {
    render("rewrite", context!(request => request))
}

pub fn decompose(raw: &str, structured: &str) -> String {
    render("decompose", context!(raw => raw, structured => structured))
}

pub fn synthesize(spec: &ObjectSpec, scene_context: &str, docs: &str) -> String {
    render(
        "synthesize",
        context! {
            object_type => spec.object_type,
            description => spec.description,
            components => spec.components,
            scene_context => scene_context,
            docs => docs,
        },
    )
}

pub fn correct(original_prompt: &str, code: &str, error: &str) -> String {
    render(
        "correct",
        context!(original_prompt => original_prompt, code => code, error => error),
    )
}

pub fn optimize(spec: &ObjectSpec, code: &str, suggestions: &[String], docs: &str) -> String {
    render(
        "optimize",
        context! {
            object_type => spec.object_type,
            description => spec.description,
            code => code,
            suggestions => suggestions,
            docs => docs,
        },
    )
}

pub fn consolidate(suggestions: &[String], code: &str) -> String {
    render(
        "consolidate",
        context!(suggestions => suggestions, code => code),
    )
}

pub fn compose(scene: &SceneDescription) -> String {
    render(
        "compose",
        context! {
            scene_name => scene.scene_name,
            scene_context => scene.scene_context,
            objects => scene.objects,
        },
    )
}

pub fn material_map(scene_context: &str, records: &[crate::core::types::ObjectRecord]) -> String {
    render(
        "material_map",
        context!(scene_context => scene_context, records => records),
    )
}

pub struct MaterialMapping {
    pub object: String,
    pub category: String,
}

pub fn material_apply(mappings: &[MaterialMapping], docs: &str) -> String {
    let rows: Vec<minijinja::Value> = mappings
        .iter()
        .map(|m| context!(object => m.object, category => m.category))
        .collect();
    render("material_apply", context!(mappings => rows, docs => docs))
}
