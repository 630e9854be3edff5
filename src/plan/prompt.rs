//! The planning instruction sent to the text model.

/// Builds the single instruction prompt for one plan request.
///
/// The model is asked to research the place, connect it to the emotion in the
/// chosen format around a female protagonist, write a "나노바나나" style post
/// and an English poster prompt, and answer with one fenced JSON block.
pub fn build_plan_prompt(place: &str, emotion: &str, content_type: &str) -> String {
    format!(
        r#"역할: 당신은 '부산 역사 스토리텔링 문화 콘텐츠 기획자'입니다.

입력 정보:
- 장소: {place} (부산)
- 감정 키워드: {emotion}
- 콘텐츠 형식: {content_type}
- 주인공: 여주인공 (Female Protagonist)

수행해야 할 작업:
1. **역사적 사실 검색**: 부산의 "{place}"와 관련된 역사적 사실, 사건, 인물을 검색하세요. 특히 "{emotion}"이라는 감정과 연결될 수 있는 사실에 집중하세요. (어조: 진지하고 신뢰감 있게)
2. **콘텐츠 기획**: 검색된 역사적 사실과 사용자의 감정 키워드를 연결하여 문화 콘텐츠를 기획하세요.
   - **형식**: 반드시 사용자가 선택한 **"{content_type}"** 형식으로 기획해야 합니다.
   - **주인공**: 이야기는 반드시 **여주인공(Female Protagonist)**을 중심으로 전개되어야 합니다.
   - 위로와 공감을 주는 시놉시스를 구상하세요. (어조: 창의적이고 따뜻하게)
3. **나노바나나 스타일 포스트 작성**: 이 콘텐츠를 홍보하는 SNS 포스트를 '나노바나나' 스타일로 작성하세요.
   - 한국의 젊은 세대(MZ)가 쓰는 언어, 유행어, 밈, 드립을 활용하고, 간결하고 재치 있게 이모지와 해시태그를 풍부하게 사용하세요.
4. **시각적 프롬프트**: 이 콘텐츠의 포스터를 생성하기 위한 AI 이미지 생성 프롬프트를 **영어(English)로 상세하게** 작성하세요.
   - 트렌디하고 감성적인(Trendy & Aesthetic) 고퀄리티 비주얼을 지향하세요.
   - 조명: Cinematic lighting, Soft ambient light, Golden hour, or Moody neon (장소와 감정에 맞게).
   - 색감: Vibrant yet harmonious colors. 구도: 시선을 사로잡는 영화 같은 구도.
   - 선택한 콘텐츠 형식({content_type})의 스타일을 세련되게 반영하세요. (예: 웹툰이면 고퀄리티 웹툰 표지, 전시회면 모던한 아트 포스터, 애니메이션이면 신카이 마코토 스타일)
   - 포스터에는 반드시 매력적인 여성 주인공이 등장하여 "{emotion}"의 감정을 섬세하게 표현해야 하며, 배경은 부산의 "{place}"를 아름답게 재해석하세요.
   - "Masterpiece, best quality, ultra-detailed, 8k, illustration, aesthetic" 등의 키워드를 포함하세요.

출력 형식:
반드시 아래의 JSON 구조를 가진 마크다운 코드 블록(```json ... ```)으로만 응답하세요. 다른 설명은 포함하지 마세요.
{{
  "historyFacts": "장소에 얽힌 역사적 사실 요약 (한국어)",
  "synopsis": "역사와 감정을 연결한 스토리 줄거리 (여주인공 중심, 한국어)",
  "contentType": "{content_type}",
  "keyMessage": "콘텐츠의 핵심 메시지와 정서적 효과",
  "targetAudience": "타겟 관객",
  "visualPrompt": "A highly detailed English description of the poster image featuring a female protagonist...",
  "socialCaption": "나노바나나 스타일의 홍보 포스트 내용 (한국어, 이모지 포함)"
}}
"#
    )
}
