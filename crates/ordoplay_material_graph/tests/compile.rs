// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end material compilation.

use ordoplay_material_graph::material::{FRAG_COLOR_INPUT, TEX_COORD, TEX_VALUE};
use ordoplay_material_graph::{
    BuildStep, CompileError, GraphError, InputRef, Material, Node, OutputRef, PortType,
    ShaderBackend, ShaderSource, ShaderStage, ShaderTemplates, SourceBackend, TemplateError,
};

/// Backend that records submissions and can be told to reject a step
#[derive(Default)]
struct MockBackend {
    reject: Option<BuildStep>,
    created: Vec<ShaderStage>,
    links: usize,
}

impl ShaderBackend for MockBackend {
    type Shader = String;
    type Program = u32;

    fn create(
        &mut self,
        stage: ShaderStage,
        source: &str,
        is_raw_text: bool,
    ) -> Result<Self::Shader, String> {
        assert!(is_raw_text);
        self.created.push(stage);
        if self.reject == Some(BuildStep::Create(stage)) {
            return Err(format!("0:1(1): error: bad {stage} shader"));
        }
        Ok(source.to_string())
    }

    fn link(&mut self, _vertex: &String, _fragment: &String) -> Result<Self::Program, String> {
        self.links += 1;
        if self.reject == Some(BuildStep::Link) {
            return Err("link error".to_string());
        }
        Ok(self.links as u32)
    }
}

/// uv -> albedo texture -> frag_color
fn albedo<P>(templates: ShaderTemplates) -> Material<P> {
    let mut material = Material::with_templates("albedo", templates);
    let albedo = material.add_texture("albedo");
    material
        .connect(&material.uv_output(), &InputRef::new(albedo, TEX_COORD))
        .unwrap();
    material
        .connect(&OutputRef::new(albedo, TEX_VALUE), &material.frag_color_input())
        .unwrap();
    material
}

#[test]
fn test_end_to_end_order_and_body() {
    let material: Material = albedo(ShaderTemplates::default());

    let order: Vec<_> = material
        .graph()
        .sort_nodes()
        .unwrap()
        .into_iter()
        .map(|id| material.node(id).unwrap().name().to_string())
        .collect();
    // Unconnected sources keep their registration slots
    assert_eq!(order, ["uv", "pos", "norm", "albedo", "frag_color"]);

    let fragment = material.generate().unwrap().fragment;
    let coord = fragment.find("vec2 tex_coord = uv;").unwrap();
    let sample = fragment.find("vec4 tex_value = texture(albedo, tex_coord);").unwrap();
    let sink = fragment.find("gl_FragColor = tex_value;").unwrap();
    assert!(coord < sample && sample < sink);
    assert!(fragment.contains("uniform sampler2D albedo;\n"));
}

#[test]
fn test_template_substitution_exactness() {
    let templates = ShaderTemplates::new("void main() {}", "//_UNIFORMS_ ... //_NODE_ASSEMBLY_");
    let mut material: Material = Material::with_templates("diffuse", templates);
    let diffuse = material.add_texture("diffuse");
    material
        .connect(&OutputRef::new(diffuse, TEX_VALUE), &material.frag_color_input())
        .unwrap();

    let source = material.generate().unwrap();
    assert_eq!(source.vertex, "void main() {}");
    assert_eq!(
        source.fragment,
        "uniform sampler2D diffuse;\n ... \
         vec4 tex_value = texture(diffuse, tex_coord);\n\
         gl_FragColor = tex_value;\n"
    );
}

#[test]
fn test_compile_is_deterministic() {
    let mut material = albedo(ShaderTemplates::default());
    let mut backend = SourceBackend;

    let first = material.compile(&mut backend).unwrap().source.clone();
    let second = material.compile(&mut backend).unwrap().source.clone();
    assert_eq!(first, second);
    assert_eq!(material.compiled().unwrap().program, first);
}

#[test]
fn test_cycle_fails_compile() {
    let mut material: Material = albedo(ShaderTemplates::default());
    let (uv, sink) = (material.uv_node(), material.frag_color_node());
    material.node_mut(sink).unwrap().add_output("color", PortType::Vec2);
    material.node_mut(uv).unwrap().add_input("feedback", PortType::Vec2);
    material
        .connect(&OutputRef::new(sink, "color"), &InputRef::new(uv, "feedback"))
        .unwrap();

    let err = material.generate().unwrap_err();
    let CompileError::Cycle(cycle) = err else {
        panic!("expected a cycle error, got {err:?}");
    };
    // The walk starts from the earliest registered unsorted node
    assert_eq!(cycle.node, uv);
    assert_eq!(cycle.name, "uv");
    assert!(cycle.involved.contains(&uv));
    assert!(cycle.involved.contains(&sink));
    assert!(!cycle.involved.contains(&material.pos_node()));
}

#[test]
fn test_missing_marker_fails_compile() {
    let templates = ShaderTemplates::new("void main() {}", "//_UNIFORMS_\nvoid main() {}");
    let mut material: Material<u32> = albedo(templates);
    let mut backend = MockBackend::default();

    let err = material.compile(&mut backend).unwrap_err();
    assert!(matches!(
        err,
        CompileError::Template(TemplateError::MissingMarker { .. })
    ));
    assert!(backend.created.is_empty());
    assert!(!material.is_compiled());
}

#[test]
fn test_build_failure_keeps_previous_program() {
    let mut material: Material<u32> = albedo(ShaderTemplates::default());
    let mut backend = MockBackend::default();
    let good = material.compile(&mut backend).unwrap().clone();
    assert_eq!(good.program, 1);

    // Change the graph, then have the backend reject the fragment stage
    material.add_uniform(PortType::Float, "roughness");
    backend.reject = Some(BuildStep::Create(ShaderStage::Fragment));
    let err = material.compile(&mut backend).unwrap_err();

    let CompileError::ShaderBuild(build) = err else {
        panic!("expected a build error, got {err:?}");
    };
    assert_eq!(build.step, BuildStep::Create(ShaderStage::Fragment));
    assert!(build.diagnostic.contains("bad fragment shader"));
    assert!(build.generated.fragment.contains("uniform float roughness;"));
    assert_eq!(material.compiled(), Some(&good));

    backend.reject = Some(BuildStep::Link);
    let err = material.compile(&mut backend).unwrap_err();
    assert!(matches!(err, CompileError::ShaderBuild(ref b) if b.step == BuildStep::Link));
    assert_eq!(material.compiled(), Some(&good));
}

#[test]
fn test_type_mismatch_rejected_at_connect() {
    let mut material: Material = Material::default();
    let tex = material.add_texture("albedo");

    let err = material
        .connect(&material.normal_output(), &InputRef::new(tex, TEX_COORD))
        .unwrap_err();
    assert!(matches!(
        err,
        GraphError::PortTypeMismatch { input_type: PortType::Vec2, output_type: PortType::Vec3, .. }
    ));
    assert_eq!(material.graph().connection_count(), 0);
}

#[test]
fn test_custom_node_chain() {
    let mut material: Material = Material::default();
    let tint = material
        .add_node(
            Node::new("tint")
                .with_input("base", PortType::Vec4)
                .with_input("normal", PortType::Vec3)
                .with_output("tinted", PortType::Vec4)
                .with_code("vec4 tinted = base * vec4(normal * 0.5 + 0.5, 1.0);\n"),
        )
        .unwrap();
    let tex = material.add_texture("albedo");

    material
        .connect(&material.uv_output(), &InputRef::new(tex, TEX_COORD))
        .unwrap();
    material
        .connect(&OutputRef::new(tex, TEX_VALUE), &InputRef::new(tint, "base"))
        .unwrap();
    material
        .connect(&material.normal_output(), &InputRef::new(tint, "normal"))
        .unwrap();
    material
        .connect(&OutputRef::new(tint, "tinted"), &InputRef::new(material.frag_color_node(), FRAG_COLOR_INPUT))
        .unwrap();

    let assembly = material.assemble_nodes().unwrap();
    assert_eq!(
        assembly,
        "vec2 tex_coord = uv;\n\
         vec4 tex_value = texture(albedo, tex_coord);\n\
         vec4 base = tex_value;\n\
         vec3 normal = norm;\n\
         vec4 tinted = base * vec4(normal * 0.5 + 0.5, 1.0);\n\
         gl_FragColor = tinted;\n"
    );
}

#[test]
fn test_source_backend_output() {
    let mut material = albedo(ShaderTemplates::default());
    let compiled = material.compile(&mut SourceBackend).unwrap();
    let ShaderSource { vertex, fragment } = &compiled.program;
    assert_eq!(vertex, &compiled.source.vertex);
    assert_eq!(fragment, &compiled.source.fragment);
}
